//! Wide-tree assembly.
//!
//! Single pass over an explicit work stack, so stack depth never depends on
//! the depth of the input tree. Each popped item is one wide node: its
//! internal children get contiguous node indices and its leaves one
//! contiguous face run.

use super::leaf::{classify, SlotKind};
use super::reorder::{gather, Reorderer};
use super::treelet::{group, root_member, Member};
use super::{CollapseParams, Context};
use crate::bvh::{BinaryBvh, Slot, WideBvh, WideNode};
use crate::util::{Error, Result};

/// Collapse a binary BVH into an 8-wide BVH.
///
/// Parameters and input are fully validated before any work starts; on error
/// nothing is returned.
#[tracing::instrument(skip_all, fields(
    nodes = bvh.nodes.len(),
    faces = bvh.faces.len(),
    max_leaf_size = params.max_leaf_size,
))]
pub fn collapse(bvh: &BinaryBvh, params: &CollapseParams) -> Result<WideBvh> {
    let ctx = Context::new(bvh, params)?;

    let mut nodes: Vec<WideNode> = Vec::new();
    nodes.try_reserve(1)?;
    nodes.push(WideNode::EMPTY);

    let mut reorderer = Reorderer::new(bvh.faces.len())?;
    let mut stack: Vec<(Member, u32)> = Vec::new();
    if let Some(root) = root_member(&ctx) {
        stack.push((root, 0));
    }

    while let Some((member, index)) = stack.pop() {
        let treelet = group(&ctx, member);
        let kinds: Vec<SlotKind> = treelet.iter().map(|m| classify(&ctx, m)).collect();

        let internal = kinds.iter().filter(|&&k| k == SlotKind::Internal).count();
        let mut next_child = reserve_nodes(&mut nodes, internal)?;

        let mut node = WideNode::EMPTY;
        let mut pushed = Vec::with_capacity(internal);
        for (i, (m, kind)) in treelet.iter().zip(&kinds).enumerate() {
            node.slots[i] = match kind {
                SlotKind::Leaf => {
                    let (offset, count) = reorderer.append(bvh, m.candidate);
                    node.aabbs[i] = reorderer.run_aabb(bvh, offset, count);
                    Slot::Leaf { offset, count }
                }
                SlotKind::Internal => {
                    // Refit once the child is filled.
                    node.aabbs[i] = m.aabb;
                    pushed.push((*m, next_child));
                    next_child += 1;
                    Slot::Internal { child: next_child - 1 }
                }
            };
        }
        nodes[index as usize] = node;

        // Reversed so children are processed in slot order.
        stack.extend(pushed.into_iter().rev());
    }

    refit(&mut nodes);

    let order = reorderer.finish();
    debug_assert_eq!(order.len(), bvh.faces.len());
    let faces = gather(bvh, &order, params)?;
    let aabb = nodes[0].aabb();

    tracing::debug!(wide_nodes = nodes.len(), faces = faces.len(), "collapsed BVH");
    Ok(WideBvh { aabb, nodes, faces })
}

/// Set every internal slot box to the union of its child's slots.
///
/// Children always sit at higher indices than their parent, so one reverse
/// sweep sees each child final before its parent reads it.
fn refit(nodes: &mut [WideNode]) {
    for index in (0..nodes.len()).rev() {
        for i in 0..nodes[index].slots.len() {
            if let Slot::Internal { child } = nodes[index].slots[i] {
                nodes[index].aabbs[i] = nodes[child as usize].aabb();
            }
        }
    }
}

/// Append `count` placeholder nodes, returning the index of the first.
fn reserve_nodes(nodes: &mut Vec<WideNode>, count: usize) -> Result<u32> {
    let first = nodes.len();
    let total = first + count;
    if u32::try_from(total).is_err() {
        return Err(Error::IndexOverflow { what: "wide node", count: total });
    }
    nodes.try_reserve(count)?;
    nodes.resize(total, WideNode::EMPTY);
    Ok(first as u32)
}
