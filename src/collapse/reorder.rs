//! Face reordering into leaf order.
//!
//! The reorderer only records source face indices; faces are gathered once
//! every leaf has its range, which is what lets the gather run in parallel.

use rayon::prelude::*;

use super::params::{CollapseParams, PARALLEL_GATHER_THRESHOLD};
use super::treelet::Candidate;
use crate::bvh::{BinaryBvh, BinaryNode, Face};
use crate::util::{Aabb, Result};

/// Shared write cursor over the output face array.
pub(crate) struct Reorderer {
    order: Vec<u32>,
}

impl Reorderer {
    /// Reserve room for every input face up front.
    pub fn new(face_count: usize) -> Result<Self> {
        let mut order = Vec::new();
        order.try_reserve_exact(face_count)?;
        Ok(Self { order })
    }

    #[inline]
    pub fn cursor(&self) -> u32 {
        self.order.len() as u32
    }

    /// Append the faces under `candidate` in depth-first, left-first order.
    ///
    /// Returns `(offset, count)` of the new run.
    pub fn append(&mut self, bvh: &BinaryBvh, candidate: Candidate) -> (u32, u32) {
        let offset = self.cursor();
        match candidate {
            Candidate::Range { first, count } => self.order.extend(first..first + count),
            Candidate::Node(root) => {
                let mut stack = vec![root];
                while let Some(index) = stack.pop() {
                    match *bvh.node(index) {
                        BinaryNode::Internal { left, right, .. } => stack.extend([right, left]),
                        BinaryNode::Leaf { first, count, .. } => self.order.extend(first..first + count),
                    }
                }
            }
        }
        (offset, self.cursor() - offset)
    }

    /// Tight box of the run `(offset, count)` from its source faces.
    pub fn run_aabb(&self, bvh: &BinaryBvh, offset: u32, count: u32) -> Aabb {
        self.order[offset as usize..(offset + count) as usize]
            .iter()
            .fold(Aabb::EMPTY, |acc, &face| acc.union(&bvh.face_aabb(face)))
    }

    /// Source face index for every output position.
    pub fn finish(self) -> Vec<u32> {
        self.order
    }
}

/// Copy faces into leaf order.
pub(crate) fn gather(bvh: &BinaryBvh, order: &[u32], params: &CollapseParams) -> Result<Vec<Face>> {
    let mut faces = Vec::new();
    faces.try_reserve_exact(order.len())?;
    let source = &bvh.faces;
    if params.parallel_gather && order.len() >= PARALLEL_GATHER_THRESHOLD {
        tracing::trace!(faces = order.len(), "parallel face gather");
        faces.par_extend(order.par_iter().map(|&i| source[i as usize]));
    } else {
        faces.extend(order.iter().map(|&i| source[i as usize]));
    }
    Ok(faces)
}
