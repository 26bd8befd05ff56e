//! Leaf collapse decision for grouped slots.

use super::treelet::{Candidate, Member};
use super::Context;
use crate::bvh::BinaryNode;

/// What a grouped member turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
    /// Whole subtree flattened into one face run.
    Leaf,
    /// Gets its own wide node.
    Internal,
}

/// Decide independently for each slot, using the same rule as the grouper.
pub(crate) fn classify(ctx: &Context<'_>, member: &Member) -> SlotKind {
    let max = ctx.params.max_leaf_size;
    let fits = member.count() <= max;
    let leaf = match member.candidate {
        // Nothing left to split.
        Candidate::Node(index) if matches!(ctx.bvh.node(index), BinaryNode::Leaf { .. }) => fits,
        Candidate::Range { .. } => fits,
        Candidate::Node(_) => member.cost.prefers_leaf(max),
    };
    if leaf {
        SlotKind::Leaf
    } else {
        SlotKind::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::{BinaryBvh, Face};
    use crate::collapse::CollapseParams;
    use crate::util::{Aabb, Vec3};

    fn pair() -> BinaryBvh {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(9.0), Vec3::splat(10.0));
        BinaryBvh::new(
            vec![
                BinaryNode::Internal { aabb: a.union(&b), left: 1, right: 2 },
                BinaryNode::Leaf { aabb: a, first: 0, count: 1 },
                BinaryNode::Leaf { aabb: b, first: 1, count: 1 },
            ],
            vec![Face::default(); 2],
            vec![Vec3::ZERO],
        )
    }

    #[test]
    fn test_binary_leaf_is_leaf_when_it_fits() {
        let bvh = pair();
        let params = CollapseParams { max_leaf_size: 1, ..Default::default() };
        let ctx = Context::new(&bvh, &params).unwrap();
        assert_eq!(classify(&ctx, &Member::node(&ctx, 1)), SlotKind::Leaf);
        assert_eq!(classify(&ctx, &Member::node(&ctx, 0)), SlotKind::Internal);
    }

    #[test]
    fn test_internal_node_uses_cost_model() {
        let bvh = pair();

        // Children are tiny relative to the root, splitting is cheap.
        let params = CollapseParams { node_traversal_cost: 0.0, max_leaf_size: 4, ..Default::default() };
        let ctx = Context::new(&bvh, &params).unwrap();
        assert_eq!(classify(&ctx, &Member::node(&ctx, 0)), SlotKind::Internal);

        // Expensive traversal makes the two-face leaf cheaper.
        let params = CollapseParams { node_traversal_cost: 10.0, max_leaf_size: 4, ..Default::default() };
        let ctx = Context::new(&bvh, &params).unwrap();
        assert_eq!(classify(&ctx, &Member::node(&ctx, 0)), SlotKind::Leaf);
    }
}
