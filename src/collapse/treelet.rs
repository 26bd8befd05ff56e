//! Treelet grouping: pick the up-to-eight subtrees that become one wide node.

use smallvec::{smallvec, SmallVec};
use std::cmp::Ordering;

use super::cost::{range_cost, split_range, SubtreeCost};
use super::Context;
use crate::bvh::{BinaryNode, BRANCHING};
use crate::util::Aabb;

/// Open-set member storage; never spills for a single treelet.
pub(crate) type Treelet = SmallVec<[Member; BRANCHING]>;

/// Subtree root that can fill a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Candidate {
    /// Binary node by index.
    Node(u32),
    /// Part of an oversized binary leaf's face range.
    Range { first: u32, count: u32 },
}

/// Candidate with its box and costs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Member {
    pub candidate: Candidate,
    pub aabb: Aabb,
    pub cost: SubtreeCost,
}

impl Member {
    pub fn node(ctx: &Context<'_>, index: u32) -> Self {
        Self {
            candidate: Candidate::Node(index),
            aabb: *ctx.bvh.node(index).aabb(),
            cost: *ctx.costs.get(index),
        }
    }

    pub fn range(ctx: &Context<'_>, first: u32, count: u32) -> Self {
        let aabb = ctx.bvh.range_aabb(first, count);
        Self {
            candidate: Candidate::Range { first, count },
            aabb,
            cost: range_cost(ctx.bvh, ctx.params, first, count, &aabb),
        }
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.cost.count
    }

    /// Binary-internal nodes, and face ranges too large for one leaf.
    fn is_expandable(&self, ctx: &Context<'_>) -> bool {
        match self.candidate {
            Candidate::Node(index) if !ctx.bvh.node(index).is_leaf() => true,
            _ => self.count() > ctx.params.max_leaf_size,
        }
    }

    fn is_worth_opening(&self, ctx: &Context<'_>) -> bool {
        self.is_expandable(ctx) && self.cost.prefers_split(ctx.params.max_leaf_size)
    }

    /// The two subtrees that replace this one when it is opened.
    fn children(&self, ctx: &Context<'_>) -> [Self; 2] {
        let (first, count) = match self.candidate {
            Candidate::Node(index) => match *ctx.bvh.node(index) {
                BinaryNode::Internal { left, right, .. } => {
                    return [Self::node(ctx, left), Self::node(ctx, right)];
                }
                BinaryNode::Leaf { first, count, .. } => (first, count),
            },
            Candidate::Range { first, count } => (first, count),
        };
        let (l, r) = split_range(first, count);
        [Self::range(ctx, l.0, l.1), Self::range(ctx, r.0, r.1)]
    }

    /// Nodes before ranges, then by index.
    fn order_key(&self) -> (u8, u32) {
        match self.candidate {
            Candidate::Node(index) => (0, index),
            Candidate::Range { first, .. } => (1, first),
        }
    }

    /// Opening priority: larger area, then more faces, then lower index.
    fn priority(&self, other: &Self) -> Ordering {
        self.aabb
            .area()
            .total_cmp(&other.aabb.area())
            .then(self.count().cmp(&other.count()))
            .then(other.order_key().cmp(&self.order_key()))
    }
}

/// Root member of the whole collapse, `None` if the tree holds no faces.
pub(crate) fn root_member(ctx: &Context<'_>) -> Option<Member> {
    let root = Member::node(ctx, 0);
    (root.count() > 0).then_some(root)
}

/// Greedily open the largest worthwhile member until eight slots are filled
/// or nothing is worth opening.
///
/// Children replace their parent in place, so leaf slots keep the binary
/// tree's left-to-right order. Face-less children are dropped.
pub(crate) fn group(ctx: &Context<'_>, root: Member) -> Treelet {
    let mut open: Treelet = smallvec![root];
    while open.len() < BRANCHING {
        let best = open
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_worth_opening(ctx))
            .max_by(|(_, a), (_, b)| a.priority(b))
            .map(|(i, _)| i);
        let Some(i) = best else { break };

        let [left, right] = open[i].children(ctx);
        open.remove(i);
        let mut at = i;
        for child in [left, right] {
            if child.count() > 0 {
                open.insert(at, child);
                at += 1;
            }
        }
    }
    open
}
