//! Shared fixtures for integration tests: small hand-made binary trees and a
//! median-split builder over triangle soups.

#![allow(dead_code)]

use std::collections::HashMap;

use bvhc::prelude::*;

/// Triangle with a unit box, anchored at `origin`.
pub fn push_tri(faces: &mut Vec<Face>, vertices: &mut Vec<Vec3>, origin: Vec3) {
    push_tri_sized(faces, vertices, origin, 1.0);
}

/// Triangle whose box is a cube of edge `size` with its min corner at `origin`.
pub fn push_tri_sized(faces: &mut Vec<Face>, vertices: &mut Vec<Vec3>, origin: Vec3, size: f32) {
    let base = vertices.len() as u32;
    vertices.extend([origin, origin + Vec3::X * size, origin + Vec3::new(0.0, size, size)]);
    faces.push(Face::new(base, base + 1, base + 2));
}

/// `n` triangles along X, two units apart.
pub fn row(n: u32) -> (Vec<Face>, Vec<Vec3>) {
    let mut faces = Vec::new();
    let mut vertices = Vec::new();
    for i in 0..n {
        push_tri(&mut faces, &mut vertices, Vec3::new(i as f32 * 2.0, 0.0, 0.0));
    }
    (faces, vertices)
}

/// `n` pseudo-random triangles in a 100-unit cube (deterministic per seed).
pub fn scatter(n: u32, seed: u64) -> (Vec<Face>, Vec<Vec3>) {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 40) as f32) / (1u64 << 24) as f32
    };
    let mut faces = Vec::new();
    let mut vertices = Vec::new();
    for _ in 0..n {
        let c = Vec3::new(next(), next(), next()) * 100.0;
        let base = vertices.len() as u32;
        for _ in 0..3 {
            vertices.push(c + Vec3::new(next(), next(), next()) * 2.0);
        }
        faces.push(Face::new(base, base + 1, base + 2));
    }
    (faces, vertices)
}

/// Root-only tree: one binary leaf holding every face.
pub fn single_leaf(faces: Vec<Face>, vertices: Vec<Vec3>) -> BinaryBvh {
    let count = faces.len() as u32;
    let mut bvh = BinaryBvh::new(Vec::new(), faces, vertices);
    let aabb = bvh.range_aabb(0, count);
    bvh.nodes.push(BinaryNode::Leaf { aabb, first: 0, count });
    bvh
}

/// `n` single-face leaves hanging off a chain of internal nodes:
/// `N_k = (L_k, N_k+1)`, the last internal node holds the final two leaves.
pub fn chain(n: u32) -> BinaryBvh {
    assert!(n >= 2);
    let (faces, vertices) = row(n);
    let mut bvh = BinaryBvh::new(Vec::new(), faces, vertices);

    // suffix[k] = box of faces k..n
    let mut suffix = vec![Aabb::EMPTY; n as usize + 1];
    for k in (0..n).rev() {
        suffix[k as usize] = suffix[k as usize + 1].union(&bvh.face_aabb(k));
    }

    let internal = n - 1;
    let leaf_index = |k: u32| internal + k;
    for k in 0..internal {
        let aabb = suffix[k as usize];
        let right = if k + 1 < internal { k + 1 } else { leaf_index(n - 1) };
        bvh.nodes.push(BinaryNode::Internal { aabb, left: leaf_index(k), right });
    }
    for k in 0..n {
        let aabb = bvh.face_aabb(k);
        bvh.nodes.push(BinaryNode::Leaf { aabb, first: k, count: 1 });
    }
    bvh
}

/// Median split on the longest axis until `leaf_size` faces remain.
/// Faces are permuted so every leaf is contiguous; boxes are tight.
pub fn build_median(faces: Vec<Face>, vertices: Vec<Vec3>, leaf_size: usize) -> BinaryBvh {
    let mut bvh = BinaryBvh::new(Vec::new(), faces, vertices);
    let n = bvh.faces.len();
    if n == 0 {
        bvh.nodes.push(BinaryNode::Leaf { aabb: Aabb::EMPTY, first: 0, count: 0 });
        return bvh;
    }
    let aabbs: Vec<Aabb> = (0..n as u32).map(|i| bvh.face_aabb(i)).collect();
    let centroids: Vec<Vec3> = aabbs.iter().map(Aabb::center).collect();
    let mut order: Vec<usize> = (0..n).collect();
    let mut nodes = Vec::new();
    split(&aabbs, &centroids, &mut order, 0, leaf_size, &mut nodes);

    bvh.faces = order.iter().map(|&i| bvh.faces[i]).collect();
    bvh.nodes = nodes;
    bvh
}

fn split(
    aabbs: &[Aabb],
    centroids: &[Vec3],
    order: &mut [usize],
    offset: u32,
    leaf_size: usize,
    nodes: &mut Vec<BinaryNode>,
) -> u32 {
    let index = nodes.len() as u32;
    let aabb = order.iter().fold(Aabb::EMPTY, |acc, &i| acc.union(&aabbs[i]));
    if order.len() <= leaf_size {
        nodes.push(BinaryNode::Leaf { aabb, first: offset, count: order.len() as u32 });
        return index;
    }
    nodes.push(BinaryNode::Leaf { aabb, first: 0, count: 0 });

    let size = aabb.size();
    let axis = if size.x >= size.y && size.x >= size.z {
        0
    } else if size.y >= size.z {
        1
    } else {
        2
    };
    order.sort_by(|&a, &b| centroids[a][axis].total_cmp(&centroids[b][axis]));
    let mid = order.len() / 2;
    let (lo, hi) = order.split_at_mut(mid);
    let left = split(aabbs, centroids, lo, offset, leaf_size, nodes);
    let right = split(aabbs, centroids, hi, offset + mid as u32, leaf_size, nodes);
    nodes[index as usize] = BinaryNode::Internal { aabb, left, right };
    index
}

/// Split `[first, first + count)` in index halves down to single-face leaves,
/// keeping face order. Boxes are tight.
pub fn build_halving(faces: Vec<Face>, vertices: Vec<Vec3>) -> BinaryBvh {
    let mut bvh = BinaryBvh::new(Vec::new(), faces, vertices);
    let n = bvh.faces.len() as u32;
    assert!(n > 0);
    let mut nodes = Vec::new();
    halve(&bvh, 0, n, &mut nodes);
    bvh.nodes = nodes;
    bvh
}

fn halve(bvh: &BinaryBvh, first: u32, count: u32, nodes: &mut Vec<BinaryNode>) -> u32 {
    let index = nodes.len() as u32;
    let aabb = bvh.range_aabb(first, count);
    if count == 1 {
        nodes.push(BinaryNode::Leaf { aabb, first, count });
        return index;
    }
    nodes.push(BinaryNode::Leaf { aabb, first: 0, count: 0 });
    let half = count / 2;
    let left = halve(bvh, first, half, nodes);
    let right = halve(bvh, first + half, count - half, nodes);
    nodes[index as usize] = BinaryNode::Internal { aabb, left, right };
    index
}

/// Grow every node box by `pad` on all sides, as a loose builder would.
pub fn pad_boxes(bvh: &mut BinaryBvh, pad: f32) {
    for node in &mut bvh.nodes {
        let (BinaryNode::Internal { aabb, .. } | BinaryNode::Leaf { aabb, .. }) = node;
        *aabb = Aabb::new(aabb.min - Vec3::splat(pad), aabb.max + Vec3::splat(pad));
    }
}

/// Walk from the root; every node exactly once, every index in range.
/// Returns leaf `(offset, count)` runs in visit order.
pub fn check_reachability(wide: &WideBvh) -> Vec<(u32, u32)> {
    let mut seen = vec![false; wide.nodes.len()];
    let mut leaves = Vec::new();
    let mut stack = vec![0u32];
    while let Some(index) = stack.pop() {
        assert!((index as usize) < wide.nodes.len(), "child {index} out of range");
        assert!(!std::mem::replace(&mut seen[index as usize], true), "node {index} visited twice");
        for slot in &wide.nodes[index as usize].slots {
            match *slot {
                Slot::Leaf { offset, count } => leaves.push((offset, count)),
                Slot::Internal { child } => stack.push(child),
                Slot::Empty => {}
            }
        }
    }
    assert!(seen.iter().all(|&s| s), "unreachable wide nodes");
    leaves
}

/// Every slot box equals the union of what it contains.
pub fn check_tightness(binary: &BinaryBvh, wide: &WideBvh) {
    let face_box = |f: &Face| Aabb::from_points(f.indices().map(|v| binary.vertices[v as usize]));
    for (n, node) in wide.nodes.iter().enumerate() {
        for (i, (aabb, slot)) in node.aabbs.iter().zip(&node.slots).enumerate() {
            let expected = match *slot {
                Slot::Empty => {
                    assert!(aabb.is_empty(), "node {n} slot {i}: empty slot with a box");
                    continue;
                }
                Slot::Leaf { offset, count } => wide.faces[offset as usize..(offset + count) as usize]
                    .iter()
                    .fold(Aabb::EMPTY, |acc, f| acc.union(&face_box(f))),
                Slot::Internal { child } => wide.nodes[child as usize].aabb(),
            };
            assert_eq!(*aabb, expected, "node {n} slot {i} is not tight");
        }
    }
    assert_eq!(wide.aabb, wide.root().unwrap().aabb());
}

/// Output faces are a permutation of the input faces.
pub fn check_permutation(binary: &BinaryBvh, wide: &WideBvh) {
    assert_eq!(wide.faces.len(), binary.faces.len());
    let mut counts: HashMap<Face, i64> = HashMap::new();
    for f in &binary.faces {
        *counts.entry(*f).or_default() += 1;
    }
    for f in &wide.faces {
        *counts.entry(*f).or_default() -= 1;
    }
    assert!(counts.values().all(|&c| c == 0), "faces duplicated or dropped");
}
