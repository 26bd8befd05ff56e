//! Utility types shared by the whole crate.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`Aabb`] and the `glam` vector type used for positions

mod error;
mod math;

pub use error::*;
pub use math::*;
