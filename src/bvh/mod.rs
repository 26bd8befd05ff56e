//! BVH data model.
//!
//! ## Architecture
//! ```text
//! BinaryBvh (external builder) → collapse → WideBvh → to_gpu → GpuBvhData → storage buffers
//! ```

pub mod binary;
pub mod gpu;
pub mod wide;

pub use binary::{BinaryBvh, BinaryNode, Face};
pub use gpu::{GpuAabb, GpuBvhData, GpuWideNode, GPU_INVALID};
pub use wide::{Slot, WideBvh, WideBvhStats, WideNode, BRANCHING};
