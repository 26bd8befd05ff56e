//! GPU storage-buffer layout of the collapsed tree.
//!
//! 264-byte nodes, read by the traversal shader as:
//! - leaf slot: `counts[i] > 0`, faces `face_index + offsets[i] ..+ counts[i]`
//! - internal slot: `counts[i] == 0`, node `child_index + offsets[i]`
//! - empty slot: `counts[i] == 0`, `offsets[i] == GPU_INVALID`, inverted box
//!
//! Field order and sizes must match the shader side.

use bytemuck::{Pod, Zeroable};

use super::binary::Face;
use super::wide::{Slot, WideBvh, WideNode, BRANCHING};
use crate::util::Aabb;

/// Offset value marking an empty slot.
pub const GPU_INVALID: u32 = u32::MAX;

/// Slot box (24 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuAabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl From<&Aabb> for GpuAabb {
    fn from(b: &Aabb) -> Self {
        Self { min: b.min.to_array(), max: b.max.to_array() }
    }
}

/// GPU-friendly wide node (264 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuWideNode {
    pub aabbs: [GpuAabb; BRANCHING],
    pub offsets: [u32; BRANCHING],
    pub counts: [u32; BRANCHING],
    /// First internal child; internal offsets are relative to it.
    pub child_index: u32,
    /// First face of this node's leaves; leaf offsets are relative to it.
    pub face_index: u32,
}

impl WideNode {
    /// Convert to the packed GPU format.
    ///
    /// Relies on the collapse layout: internal children of one node are
    /// contiguous, and so are its leaf face runs.
    pub fn to_gpu(&self) -> GpuWideNode {
        let child_index = self.children().min().unwrap_or(0);
        let face_index = self
            .slots
            .iter()
            .filter_map(|s| match *s {
                Slot::Leaf { offset, .. } => Some(offset),
                _ => None,
            })
            .min()
            .unwrap_or(0);

        let mut node = GpuWideNode {
            aabbs: self.aabbs.map(|b| GpuAabb::from(&b)),
            offsets: [GPU_INVALID; BRANCHING],
            counts: [0; BRANCHING],
            child_index,
            face_index,
        };
        for (i, slot) in self.slots.iter().enumerate() {
            match *slot {
                Slot::Empty => {}
                Slot::Leaf { offset, count } => {
                    node.offsets[i] = offset - face_index;
                    node.counts[i] = count;
                }
                Slot::Internal { child } => node.offsets[i] = child - child_index,
            }
        }
        node
    }
}

/// Collapsed tree data ready for GPU upload.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuBvhData {
    /// Root box.
    pub aabb: GpuAabb,
    /// Node array (bytemuck-castable).
    pub nodes: Vec<GpuWideNode>,
    /// Faces in leaf order.
    pub faces: Vec<Face>,
}

impl WideBvh {
    /// Build GPU-ready buffers. Faces are copied; the tree can be released afterwards.
    pub fn to_gpu(&self) -> GpuBvhData {
        GpuBvhData {
            aabb: GpuAabb::from(&self.aabb),
            nodes: self.nodes.iter().map(WideNode::to_gpu).collect(),
            faces: self.faces.clone(),
        }
    }
}

/// Convert GpuBvhData to raw byte slices for buffer creation.
impl GpuBvhData {
    /// Node data as bytes.
    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Face data as bytes.
    pub fn faces_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.faces)
    }
}
