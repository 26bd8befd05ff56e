//! # bvhc
//!
//! Collapses a binary bounding volume hierarchy into an 8-wide BVH whose node
//! and face arrays can be uploaded as-is into the storage buffers of a GPU
//! ray traversal shader.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (Aabb, errors)
//! - [`bvh`] - Binary input tree, wide output tree, GPU layout
//! - [`collapse`] - Cost model, treelet grouping and wide-tree assembly
//! - [`io`] - `BVH2` / `BVH8` binary files
//!
//! ## Example
//!
//! ```ignore
//! use bvhc::prelude::*;
//!
//! let binary = bvhc::io::read_bvh2("scene.bvh2")?;
//! let wide = collapse(&binary, &CollapseParams::default())?;
//! println!("{} wide nodes", wide.node_count());
//! ```

pub mod util;
pub mod bvh;
pub mod collapse;
pub mod io;

// Re-export commonly used types
pub use util::{Aabb, Error, Result};
pub use collapse::{collapse, CollapseParams};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Aabb, Error, Result, Vec3};
    pub use crate::bvh::{BinaryBvh, BinaryNode, Face, Slot, WideBvh, WideNode, BRANCHING};
    pub use crate::collapse::{collapse, CollapseParams};
}
