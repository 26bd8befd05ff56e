//! Error types for the collapse library.

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for BVH collapse and file operations.
#[derive(Error, Debug)]
pub enum Error {
    /// `max_leaf_size` is zero
    #[error("Invalid configuration: max_leaf_size must be at least 1")]
    ZeroLeafSize,

    /// `max_leaf_size` does not fit the output count field
    #[error("Invalid configuration: max_leaf_size {0} exceeds the u32 leaf count field")]
    LeafSizeOverflow(usize),

    /// Face intersection cost is zero, negative or not finite
    #[error("Invalid configuration: face_intersection_cost must be positive, got {0}")]
    FaceCost(f32),

    /// Node traversal cost is negative or not finite
    #[error("Invalid configuration: node_traversal_cost must be non-negative, got {0}")]
    TraversalCost(f32),

    /// Input tree has no nodes at all
    #[error("Input BVH has no nodes")]
    EmptyTree,

    /// Internal node references a node outside the node array
    #[error("Node {node} references child {child} out of bounds (count: {count})")]
    ChildOutOfBounds { node: u32, child: u32, count: usize },

    /// A node is reachable more than once from the root
    #[error("Node {0} is reachable more than once; input is not a tree")]
    NotATree(u32),

    /// Leaf face range exceeds the face array
    #[error("Leaf {node} face range {first}+{count} out of bounds (faces: {face_count})")]
    FaceRangeOutOfBounds { node: u32, first: u32, count: u32, face_count: usize },

    /// Face references a vertex outside the vertex array
    #[error("Face {face} references vertex {vertex} out of bounds (vertices: {vertex_count})")]
    VertexOutOfBounds { face: u32, vertex: u32, vertex_count: usize },

    /// Reachable leaves do not partition the face array
    #[error("Face {0} is referenced by more than one leaf")]
    FaceSharedByLeaves(u32),

    /// Some faces are not referenced by any reachable leaf
    #[error("Leaves cover {covered} of {total} faces")]
    UncoveredFaces { covered: usize, total: usize },

    /// Too many faces or nodes for the 32-bit output indices
    #[error("{what} count {count} exceeds the u32 index range")]
    IndexOverflow { what: &'static str, count: usize },

    /// Output arrays could not be allocated
    #[error("Allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid file: expected {expected:?} magic bytes")]
    InvalidMagic { expected: [u8; 4] },

    /// Unsupported file format version
    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u32),

    /// File is truncated or corrupted
    #[error("Unexpected end of data at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// Params file could not be parsed or written
    #[error("Invalid params: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// True for errors caused by the collapse parameters rather than the input.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ZeroLeafSize | Self::LeafSizeOverflow(_) | Self::FaceCost(_) | Self::TraversalCost(_)
        )
    }
}

/// Result type alias for collapse operations.
pub type Result<T> = std::result::Result<T, Error>;
