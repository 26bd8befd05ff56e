//! 8-wide BVH produced by the collapse.
//!
//! Nodes are fixed-capacity: eight boxes and eight slots each, stored in one
//! flat array (index 0 = root). Slots reference other nodes and face runs by
//! index only.

use serde::Serialize;

use super::binary::Face;
use crate::util::Aabb;

/// Branching factor of the wide tree.
pub const BRANCHING: usize = 8;

/// One child slot of a wide node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Unused.
    #[default]
    Empty,
    /// `count` faces starting at `offset` in [`WideBvh::faces`].
    Leaf { offset: u32, count: u32 },
    /// Another wide node, by index into [`WideBvh::nodes`].
    Internal { child: u32 },
}

impl Slot {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Wide node: eight slot boxes plus eight slots.
///
/// Occupied slots come first; empty slots carry [`Aabb::EMPTY`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WideNode {
    pub aabbs: [Aabb; BRANCHING],
    pub slots: [Slot; BRANCHING],
}

impl WideNode {
    pub const EMPTY: Self = Self {
        aabbs: [Aabb::EMPTY; BRANCHING],
        slots: [Slot::Empty; BRANCHING],
    };

    /// Occupied slots with their boxes, in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (&Aabb, &Slot)> + '_ {
        self.aabbs.iter().zip(self.slots.iter()).filter(|(_, s)| !s.is_empty())
    }

    #[inline]
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    /// Union of the occupied slot boxes.
    pub fn aabb(&self) -> Aabb {
        self.occupied().fold(Aabb::EMPTY, |acc, (b, _)| acc.union(b))
    }

    /// Child node indices, in slot order.
    pub fn children(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().filter_map(|s| match *s {
            Slot::Internal { child } => Some(child),
            _ => None,
        })
    }
}

impl Default for WideNode {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Collapsed tree: root box, node array and reordered faces.
///
/// Owns both arrays. Call [`WideBvh::release`] (or drop it) once the arrays
/// have been uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct WideBvh {
    /// Union of the root node's slot boxes ([`Aabb::EMPTY`] for empty input).
    pub aabb: Aabb,
    /// Flat node array (index 0 = root).
    pub nodes: Vec<WideNode>,
    /// Input faces permuted into leaf order; each leaf is a contiguous run.
    pub faces: Vec<Face>,
}

/// Shape summary of a wide tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WideBvhStats {
    pub node_count: usize,
    pub face_count: usize,
    pub leaf_count: usize,
    pub internal_slots: usize,
    pub empty_slots: usize,
    pub max_leaf_size: u32,
    pub avg_leaf_size: f32,
    pub max_depth: usize,
}

impl WideBvh {
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Root node; `None` only for a hand-built tree with no nodes.
    #[inline]
    pub fn root(&self) -> Option<&WideNode> {
        self.nodes.first()
    }

    /// Visit reachable nodes depth-first as `(index, depth)`, root first.
    pub fn visit(&self, mut f: impl FnMut(u32, usize)) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![(0u32, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            f(index, depth);
            let node = &self.nodes[index as usize];
            let children: Vec<u32> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
    }

    /// Count nodes, slots and leaf sizes.
    pub fn stats(&self) -> WideBvhStats {
        let mut stats = WideBvhStats {
            node_count: self.nodes.len(),
            face_count: self.faces.len(),
            ..Default::default()
        };

        self.visit(|index, depth| {
            stats.max_depth = stats.max_depth.max(depth);
            for slot in &self.nodes[index as usize].slots {
                match *slot {
                    Slot::Empty => stats.empty_slots += 1,
                    Slot::Leaf { count, .. } => {
                        stats.leaf_count += 1;
                        stats.max_leaf_size = stats.max_leaf_size.max(count);
                    }
                    Slot::Internal { .. } => stats.internal_slots += 1,
                }
            }
        });

        if stats.leaf_count > 0 {
            stats.avg_leaf_size = self.faces.len() as f32 / stats.leaf_count as f32;
        }
        stats
    }

    /// Split into `(aabb, nodes, faces)`.
    pub fn into_parts(self) -> (Aabb, Vec<WideNode>, Vec<Face>) {
        (self.aabb, self.nodes, self.faces)
    }

    /// Free both arrays.
    pub fn release(self) {
        tracing::trace!(nodes = self.nodes.len(), faces = self.faces.len(), "releasing wide BVH");
        drop(self);
    }
}
