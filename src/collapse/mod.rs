//! Binary-to-wide BVH collapse.
//!
//! ## Architecture
//! ```text
//! assemble ─▶ treelet::group ─▶ cost (SAH) ─▶ leaf::classify ─▶ reorder
//!     ▲                                              │
//!     └──────────── internal slots (work stack) ◀────┘
//! ```
//!
//! ## Usage
//! ```ignore
//! let wide = bvhc::collapse::collapse(&binary, &CollapseParams::default())?;
//! let gpu = wide.to_gpu();
//! queue.write_buffer(&nodes_buffer, 0, gpu.nodes_bytes());
//! wide.release();
//! ```

mod assemble;
mod cost;
mod leaf;
mod params;
mod reorder;
mod treelet;

pub use assemble::collapse;
pub use cost::{cost_leaf, cost_split, tree_cost};
pub use params::{CollapseParams, PARALLEL_GATHER_THRESHOLD};

use crate::bvh::BinaryBvh;
use crate::util::Result;
use cost::CostTable;

/// Validated input, parameters and cost table shared by the collapse stages.
pub(crate) struct Context<'a> {
    pub bvh: &'a BinaryBvh,
    pub params: &'a CollapseParams,
    pub costs: CostTable,
}

impl<'a> Context<'a> {
    pub fn new(bvh: &'a BinaryBvh, params: &'a CollapseParams) -> Result<Self> {
        params.validate()?;
        let order = bvh.validate()?;
        let costs = CostTable::build(bvh, params, &order);
        Ok(Self { bvh, params, costs })
    }
}
