//! `BVH2`: binary input tree.
//!
//! ```text
//! magic "BVH2" | version u32 | node_count u32 | face_count u32 | vertex_count u32
//! nodes:    min f32x3 | max f32x3 | kind u32 (0 internal, 1 leaf) | a u32 | b u32
//! faces:    v0 u32 | v1 u32 | v2 u32
//! vertices: x f32 | y f32 | z f32
//! ```
//! `a, b` are `left, right` for internal nodes and `first, count` for leaves.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{count_u32, ByteReader, FileBytes, FORMAT_VERSION};
use crate::bvh::{BinaryBvh, BinaryNode, Face};
use crate::util::{Error, Result, Vec3};

pub const BVH2_MAGIC: [u8; 4] = *b"BVH2";

const NODE_SIZE: u64 = 36;
const FACE_SIZE: u64 = 12;
const VERTEX_SIZE: u64 = 12;

const KIND_INTERNAL: u32 = 0;
const KIND_LEAF: u32 = 1;

/// Parse a `BVH2` buffer. The tree is not validated here; `collapse` does that.
#[tracing::instrument(skip_all, fields(bytes = data.len()))]
pub fn read_bvh2_bytes(data: &[u8]) -> Result<BinaryBvh> {
    let mut r = ByteReader::new(data);
    r.preamble(BVH2_MAGIC)?;
    let node_count = r.u32()?;
    let face_count = r.u32()?;
    let vertex_count = r.u32()?;
    r.require(
        node_count as u64 * NODE_SIZE + face_count as u64 * FACE_SIZE + vertex_count as u64 * VERTEX_SIZE,
    )?;

    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        let at = r.position();
        let aabb = r.aabb()?;
        let kind = r.u32()?;
        let a = r.u32()?;
        let b = r.u32()?;
        nodes.push(match kind {
            KIND_INTERNAL => BinaryNode::Internal { aabb, left: a, right: b },
            KIND_LEAF => BinaryNode::Leaf { aabb, first: a, count: b },
            other => return Err(Error::invalid(format!("unknown node kind {other} at byte {at}"))),
        });
    }

    let mut faces = Vec::with_capacity(face_count as usize);
    for _ in 0..face_count {
        faces.push(Face::new(r.u32()?, r.u32()?, r.u32()?));
    }

    let mut vertices = Vec::with_capacity(vertex_count as usize);
    for _ in 0..vertex_count {
        vertices.push(Vec3::from(r.f32x3()?));
    }

    tracing::debug!(node_count, face_count, vertex_count, "read BVH2");
    Ok(BinaryBvh::new(nodes, faces, vertices))
}

/// Read a `BVH2` file (memory-mapped with the `mmap` feature).
pub fn read_bvh2(path: impl AsRef<Path>) -> Result<BinaryBvh> {
    let bytes = FileBytes::open(path.as_ref())?;
    read_bvh2_bytes(bytes.as_slice())
}

/// Serialize a binary tree.
pub fn write_bvh2<W: Write>(w: &mut W, bvh: &BinaryBvh) -> Result<()> {
    w.write_all(&BVH2_MAGIC)?;
    w.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    w.write_u32::<LittleEndian>(count_u32("node", bvh.nodes.len())?)?;
    w.write_u32::<LittleEndian>(count_u32("face", bvh.faces.len())?)?;
    w.write_u32::<LittleEndian>(count_u32("vertex", bvh.vertices.len())?)?;

    for node in &bvh.nodes {
        let (kind, a, b) = match *node {
            BinaryNode::Internal { left, right, .. } => (KIND_INTERNAL, left, right),
            BinaryNode::Leaf { first, count, .. } => (KIND_LEAF, first, count),
        };
        let aabb = node.aabb();
        for v in aabb.min.to_array().into_iter().chain(aabb.max.to_array()) {
            w.write_f32::<LittleEndian>(v)?;
        }
        w.write_u32::<LittleEndian>(kind)?;
        w.write_u32::<LittleEndian>(a)?;
        w.write_u32::<LittleEndian>(b)?;
    }
    for face in &bvh.faces {
        for v in face.indices() {
            w.write_u32::<LittleEndian>(v)?;
        }
    }
    for vertex in &bvh.vertices {
        for v in vertex.to_array() {
            w.write_f32::<LittleEndian>(v)?;
        }
    }
    Ok(())
}

/// Write a `BVH2` file.
pub fn save_bvh2(path: impl AsRef<Path>, bvh: &BinaryBvh) -> Result<()> {
    let mut w = BufWriter::new(std::fs::File::create(path)?);
    write_bvh2(&mut w, bvh)?;
    w.flush()?;
    Ok(())
}
