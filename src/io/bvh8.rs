//! `BVH8`: collapsed GPU buffers.
//!
//! ```text
//! magic "BVH8" | version u32 | root min f32x3 | root max f32x3 | node_count u32 | face_count u32
//! nodes: GpuWideNode fields in declaration order (264 bytes each)
//! faces: v0 u32 | v1 u32 | v2 u32
//! ```
//! Written field by field so the file is little-endian on every host; on
//! little-endian hosts the node and face sections equal the GPU buffers byte for byte.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{count_u32, ByteReader, FileBytes, FORMAT_VERSION};
use crate::bvh::{Face, GpuAabb, GpuBvhData, GpuWideNode, BRANCHING};
use crate::util::Result;

pub const BVH8_MAGIC: [u8; 4] = *b"BVH8";

const NODE_SIZE: u64 = std::mem::size_of::<GpuWideNode>() as u64;
const FACE_SIZE: u64 = std::mem::size_of::<Face>() as u64;

fn write_aabb<W: Write>(w: &mut W, b: &GpuAabb) -> Result<()> {
    for v in b.min.into_iter().chain(b.max) {
        w.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}

fn read_aabb(r: &mut ByteReader<'_>) -> Result<GpuAabb> {
    Ok(GpuAabb { min: r.f32x3()?, max: r.f32x3()? })
}

/// Serialize collapsed buffers.
pub fn write_bvh8<W: Write>(w: &mut W, data: &GpuBvhData) -> Result<()> {
    w.write_all(&BVH8_MAGIC)?;
    w.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    write_aabb(w, &data.aabb)?;
    w.write_u32::<LittleEndian>(count_u32("node", data.nodes.len())?)?;
    w.write_u32::<LittleEndian>(count_u32("face", data.faces.len())?)?;

    for node in &data.nodes {
        for b in &node.aabbs {
            write_aabb(w, b)?;
        }
        for &v in node.offsets.iter().chain(&node.counts) {
            w.write_u32::<LittleEndian>(v)?;
        }
        w.write_u32::<LittleEndian>(node.child_index)?;
        w.write_u32::<LittleEndian>(node.face_index)?;
    }
    for face in &data.faces {
        for v in face.indices() {
            w.write_u32::<LittleEndian>(v)?;
        }
    }
    Ok(())
}

/// Write a `BVH8` file.
#[tracing::instrument(skip_all, fields(nodes = data.nodes.len(), faces = data.faces.len()))]
pub fn save_bvh8(path: impl AsRef<Path>, data: &GpuBvhData) -> Result<()> {
    let mut w = BufWriter::new(std::fs::File::create(path)?);
    write_bvh8(&mut w, data)?;
    w.flush()?;
    Ok(())
}

/// Parse a `BVH8` buffer.
pub fn read_bvh8_bytes(data: &[u8]) -> Result<GpuBvhData> {
    let mut r = ByteReader::new(data);
    r.preamble(BVH8_MAGIC)?;
    let aabb = read_aabb(&mut r)?;
    let node_count = r.u32()?;
    let face_count = r.u32()?;
    r.require(node_count as u64 * NODE_SIZE + face_count as u64 * FACE_SIZE)?;

    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        let mut node = GpuWideNode {
            aabbs: [GpuAabb { min: [0.0; 3], max: [0.0; 3] }; BRANCHING],
            offsets: [0; BRANCHING],
            counts: [0; BRANCHING],
            child_index: 0,
            face_index: 0,
        };
        for b in &mut node.aabbs {
            *b = read_aabb(&mut r)?;
        }
        for v in node.offsets.iter_mut().chain(node.counts.iter_mut()) {
            *v = r.u32()?;
        }
        node.child_index = r.u32()?;
        node.face_index = r.u32()?;
        nodes.push(node);
    }

    let mut faces = Vec::with_capacity(face_count as usize);
    for _ in 0..face_count {
        faces.push(Face::new(r.u32()?, r.u32()?, r.u32()?));
    }

    Ok(GpuBvhData { aabb, nodes, faces })
}

/// Read a `BVH8` file.
pub fn read_bvh8(path: impl AsRef<Path>) -> Result<GpuBvhData> {
    let bytes = FileBytes::open(path.as_ref())?;
    read_bvh8_bytes(bytes.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::{Slot, WideBvh, WideNode};
    use crate::io::{read_header, Header};
    use crate::util::{Aabb, Vec3};

    #[test]
    fn test_node_section_matches_gpu_bytes() {
        let mut node = WideNode::EMPTY;
        node.aabbs[0] = Aabb::new(Vec3::ZERO, Vec3::ONE);
        node.slots[0] = Slot::Leaf { offset: 0, count: 2 };
        let data = WideBvh {
            aabb: node.aabb(),
            nodes: vec![node],
            faces: vec![Face::new(0, 1, 2), Face::new(3, 4, 5)],
        }
        .to_gpu();

        let mut buf = Vec::new();
        write_bvh8(&mut buf, &data).unwrap();
        let header = 8 + 24 + 8;
        assert_eq!(buf.len(), header + 264 + 24);
        if cfg!(target_endian = "little") {
            assert_eq!(&buf[header..header + 264], data.nodes_bytes());
            assert_eq!(&buf[header + 264..], data.faces_bytes());
        }

        let back = read_bvh8_bytes(&buf).unwrap();
        assert_eq!(back.nodes, data.nodes);
        assert_eq!(back.faces, data.faces);

        match read_header(&buf).unwrap() {
            Header::Bvh8 { nodes, faces, aabb } => {
                assert_eq!((nodes, faces), (1, 2));
                assert_eq!(aabb.max, Vec3::ONE);
            }
            other => panic!("unexpected header {other:?}"),
        }
    }
}
