//! SAH-style cost model.
//!
//! Costs are relative to the subtree's own box: a child's cost is weighted by
//! the ratio of its surface area to the parent's, approximating the chance a
//! ray that hits the parent also hits the child.

use super::params::CollapseParams;
use crate::bvh::{BinaryBvh, BinaryNode, Slot, WideBvh};
use crate::util::Aabb;

/// Cost of intersecting `n` faces as one leaf.
#[inline]
pub fn cost_leaf(params: &CollapseParams, n: u32) -> f32 {
    params.face_intersection_cost * n as f32
}

/// Cost of splitting `parent` into two children with known minimal costs.
pub fn cost_split(params: &CollapseParams, parent: &Aabb, children: [(&Aabb, f32); 2]) -> f32 {
    let parent_area = parent.area();
    let [(a0, c0), (a1, c1)] = children;
    params.node_traversal_cost + area_ratio(a0, parent_area) * c0 + area_ratio(a1, parent_area) * c1
}

/// Child/parent area ratio; 1 when the parent has no usable area.
#[inline]
fn area_ratio(child: &Aabb, parent_area: f32) -> f32 {
    if parent_area > 0.0 && parent_area.is_finite() {
        child.area() / parent_area
    } else {
        1.0
    }
}

/// Face count and both cost options of one subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SubtreeCost {
    pub count: u32,
    pub leaf: f32,
    /// `f32::INFINITY` when there is nothing left to split.
    pub split: f32,
}

impl SubtreeCost {
    const ZERO: Self = Self { count: 0, leaf: 0.0, split: f32::INFINITY };

    fn terminal(params: &CollapseParams, count: u32) -> Self {
        Self { count, leaf: cost_leaf(params, count), split: f32::INFINITY }
    }

    /// Minimal cost; the leaf option only counts when it fits a leaf.
    #[inline]
    pub fn min_cost(&self, max_leaf_size: u32) -> f32 {
        if self.count <= max_leaf_size {
            self.leaf.min(self.split)
        } else {
            self.split
        }
    }

    /// True if this subtree should become a single leaf. Always the negation
    /// of [`Self::prefers_split`], also for NaN costs.
    #[inline]
    pub fn prefers_leaf(&self, max_leaf_size: u32) -> bool {
        !self.prefers_split(max_leaf_size)
    }

    /// True if splitting pays off or is forced by the leaf size.
    #[inline]
    pub fn prefers_split(&self, max_leaf_size: u32) -> bool {
        self.count > max_leaf_size || self.split < self.leaf
    }
}

/// Cost of the face range `[first, first + count)` split recursively in halves.
///
/// Ranges come from binary leaves holding more than `max_leaf_size` faces;
/// recursion depth is `log2(count / max_leaf_size)`.
pub(crate) fn range_cost(
    bvh: &BinaryBvh,
    params: &CollapseParams,
    first: u32,
    count: u32,
    aabb: &Aabb,
) -> SubtreeCost {
    if count <= params.max_leaf_size {
        return SubtreeCost::terminal(params, count);
    }
    let (left, right) = split_range(first, count);
    let left_box = bvh.range_aabb(left.0, left.1);
    let right_box = bvh.range_aabb(right.0, right.1);
    let lc = range_cost(bvh, params, left.0, left.1, &left_box).min_cost(params.max_leaf_size);
    let rc = range_cost(bvh, params, right.0, right.1, &right_box).min_cost(params.max_leaf_size);
    SubtreeCost {
        count,
        leaf: cost_leaf(params, count),
        split: cost_split(params, aabb, [(&left_box, lc), (&right_box, rc)]),
    }
}

/// Halves of a face range as `(first, count)` pairs.
#[inline]
pub(crate) fn split_range(first: u32, count: u32) -> ((u32, u32), (u32, u32)) {
    let half = count / 2;
    ((first, half), (first + half, count - half))
}

/// Per-node face counts and costs of the binary tree.
pub(crate) struct CostTable {
    entries: Vec<SubtreeCost>,
}

impl CostTable {
    /// Fill bottom-up from a pre-order of the reachable nodes.
    #[tracing::instrument(skip_all, fields(nodes = order.len()))]
    pub fn build(bvh: &BinaryBvh, params: &CollapseParams, order: &[u32]) -> Self {
        let mut entries = vec![SubtreeCost::ZERO; bvh.nodes.len()];
        for &index in order.iter().rev() {
            entries[index as usize] = match *bvh.node(index) {
                BinaryNode::Leaf { aabb, first, count } => range_cost(bvh, params, first, count, &aabb),
                BinaryNode::Internal { aabb, left, right } => {
                    let l = entries[left as usize];
                    let r = entries[right as usize];
                    let count = l.count + r.count;
                    let split = cost_split(
                        params,
                        &aabb,
                        [
                            (bvh.node(left).aabb(), l.min_cost(params.max_leaf_size)),
                            (bvh.node(right).aabb(), r.min_cost(params.max_leaf_size)),
                        ],
                    );
                    SubtreeCost { count, leaf: cost_leaf(params, count), split }
                }
            };
        }
        Self { entries }
    }

    #[inline]
    pub fn get(&self, node: u32) -> &SubtreeCost {
        &self.entries[node as usize]
    }
}

/// Expected traversal cost of a collapsed tree, relative to its root box.
///
/// Each node pays `node_traversal_cost` and each leaf `cost_leaf(count)`,
/// weighted by the area of the slot box that leads to it.
pub fn tree_cost(bvh: &WideBvh, params: &CollapseParams) -> f32 {
    if bvh.nodes.is_empty() {
        return 0.0;
    }
    let root_area = bvh.aabb.area();
    let mut total = 0.0f32;
    let mut stack = vec![(0u32, 1.0f32)];
    while let Some((index, weight)) = stack.pop() {
        total += params.node_traversal_cost * weight;
        let node = &bvh.nodes[index as usize];
        for (aabb, slot) in node.occupied() {
            let w = area_ratio(aabb, root_area);
            match *slot {
                Slot::Leaf { count, .. } => total += cost_leaf(params, count) * w,
                Slot::Internal { child } => stack.push((child, w)),
                Slot::Empty => {}
            }
        }
    }
    total
}
