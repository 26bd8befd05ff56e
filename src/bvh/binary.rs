//! Binary BVH input, as produced by an external builder.
//!
//! The collapse never modifies this tree. Node 0 is the root; leaves reference
//! contiguous face ranges, faces reference vertex positions.

use bytemuck::{Pod, Zeroable};

use crate::util::{Aabb, Error, Result, Vec3};

/// Triangle primitive: three vertex indices (12 bytes, matches the GPU face buffer).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Face {
    pub v0: u32,
    pub v1: u32,
    pub v2: u32,
}

impl Face {
    #[inline]
    pub const fn new(v0: u32, v1: u32, v2: u32) -> Self {
        Self { v0, v1, v2 }
    }

    #[inline]
    pub fn indices(&self) -> [u32; 3] {
        [self.v0, self.v1, self.v2]
    }
}

/// Node of the binary input tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryNode {
    /// Two children, by index into the node array.
    Internal { aabb: Aabb, left: u32, right: u32 },
    /// Faces `[first, first + count)`.
    Leaf { aabb: Aabb, first: u32, count: u32 },
}

impl BinaryNode {
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        match self {
            Self::Internal { aabb, .. } | Self::Leaf { aabb, .. } => aabb,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Binary BVH with the face and vertex arrays it indexes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinaryBvh {
    /// Flat node array (index 0 = root).
    pub nodes: Vec<BinaryNode>,
    /// Faces referenced by leaf ranges.
    pub faces: Vec<Face>,
    /// Vertex positions referenced by faces.
    pub vertices: Vec<Vec3>,
}

impl BinaryBvh {
    pub fn new(nodes: Vec<BinaryNode>, faces: Vec<Face>, vertices: Vec<Vec3>) -> Self {
        Self { nodes, faces, vertices }
    }

    /// Root node, if the tree has any nodes.
    #[inline]
    pub fn root(&self) -> Option<&BinaryNode> {
        self.nodes.first()
    }

    #[inline]
    pub fn node(&self, index: u32) -> &BinaryNode {
        &self.nodes[index as usize]
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Tight box of one face.
    #[inline]
    pub fn face_aabb(&self, face: u32) -> Aabb {
        let f = self.faces[face as usize];
        Aabb::from_points(f.indices().map(|v| self.vertices[v as usize]))
    }

    /// Tight box of the faces `[first, first + count)`.
    pub fn range_aabb(&self, first: u32, count: u32) -> Aabb {
        let mut b = Aabb::EMPTY;
        for face in first..first + count {
            b.expand_by_box(&self.face_aabb(face));
        }
        b
    }

    /// Check that the tree is well formed.
    ///
    /// Returns the reachable nodes in pre-order (parent before children, left
    /// before right). Reversing it gives a valid bottom-up order.
    #[tracing::instrument(skip_all, fields(nodes = self.nodes.len(), faces = self.faces.len()))]
    pub fn validate(&self) -> Result<Vec<u32>> {
        if self.nodes.is_empty() {
            return Err(Error::EmptyTree);
        }
        if u32::try_from(self.nodes.len()).is_err() {
            return Err(Error::IndexOverflow { what: "node", count: self.nodes.len() });
        }
        if u32::try_from(self.faces.len()).is_err() {
            return Err(Error::IndexOverflow { what: "face", count: self.faces.len() });
        }

        for (face, f) in self.faces.iter().enumerate() {
            for vertex in f.indices() {
                if vertex as usize >= self.vertices.len() {
                    return Err(Error::VertexOutOfBounds {
                        face: face as u32,
                        vertex,
                        vertex_count: self.vertices.len(),
                    });
                }
            }
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut covered = vec![false; self.faces.len()];
        let mut covered_count = 0usize;
        let mut order = Vec::with_capacity(self.nodes.len());

        // Right pushed first so the left subtree is visited first.
        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            if std::mem::replace(&mut visited[index as usize], true) {
                return Err(Error::NotATree(index));
            }
            order.push(index);

            match *self.node(index) {
                BinaryNode::Internal { left, right, .. } => {
                    for child in [right, left] {
                        if child as usize >= self.nodes.len() {
                            return Err(Error::ChildOutOfBounds {
                                node: index,
                                child,
                                count: self.nodes.len(),
                            });
                        }
                        stack.push(child);
                    }
                }
                BinaryNode::Leaf { first, count, .. } => {
                    if first as u64 + count as u64 > self.faces.len() as u64 {
                        return Err(Error::FaceRangeOutOfBounds {
                            node: index,
                            first,
                            count,
                            face_count: self.faces.len(),
                        });
                    }
                    for face in first..first + count {
                        if std::mem::replace(&mut covered[face as usize], true) {
                            return Err(Error::FaceSharedByLeaves(face));
                        }
                    }
                    covered_count += count as usize;
                }
            }
        }

        if covered_count != self.faces.len() {
            return Err(Error::UncoveredFaces { covered: covered_count, total: self.faces.len() });
        }

        tracing::trace!(reachable = order.len(), "binary BVH validated");
        Ok(order)
    }
}
