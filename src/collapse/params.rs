//! Collapse parameters.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::util::{Error, Result};

/// Face count from which the final face gather runs on the rayon pool.
pub const PARALLEL_GATHER_THRESHOLD: usize = 64 * 1024;

/// Cost model and layout parameters for [`collapse`](super::collapse).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollapseParams {
    /// Cost of one ray/face intersection test. Must be positive.
    pub face_intersection_cost: f32,
    /// Cost of visiting one wide node. Must be non-negative.
    pub node_traversal_cost: f32,
    /// Hard ceiling on faces per leaf.
    pub max_leaf_size: u32,
    /// Gather reordered faces on the rayon pool for large inputs.
    pub parallel_gather: bool,
}

impl Default for CollapseParams {
    fn default() -> Self {
        Self {
            face_intersection_cost: 1.0,
            node_traversal_cost: 1.0,
            max_leaf_size: 4,
            parallel_gather: true,
        }
    }
}

impl CollapseParams {
    /// Set the leaf size from a host-sized value, rejecting values the
    /// 32-bit leaf count field cannot hold.
    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Result<Self> {
        self.max_leaf_size =
            u32::try_from(max_leaf_size).map_err(|_| Error::LeafSizeOverflow(max_leaf_size))?;
        Ok(self)
    }

    /// Reject parameters the cost model cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_leaf_size == 0 {
            return Err(Error::ZeroLeafSize);
        }
        if !(self.face_intersection_cost.is_finite() && self.face_intersection_cost > 0.0) {
            return Err(Error::FaceCost(self.face_intersection_cost));
        }
        if !(self.node_traversal_cost.is_finite() && self.node_traversal_cost >= 0.0) {
            return Err(Error::TraversalCost(self.node_traversal_cost));
        }
        Ok(())
    }

    /// Load params from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let params: Self = serde_json::from_str(&text)?;
        tracing::debug!(?params, path = %path.display(), "loaded collapse params");
        Ok(params)
    }

    /// Save params as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        CollapseParams::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_params() {
        let base = CollapseParams::default();
        let zero = CollapseParams { max_leaf_size: 0, ..base };
        assert!(matches!(zero.validate(), Err(Error::ZeroLeafSize)));

        for cost in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let p = CollapseParams { face_intersection_cost: cost, ..base };
            assert!(matches!(p.validate(), Err(Error::FaceCost(_))), "face cost {cost}");
        }

        let p = CollapseParams { node_traversal_cost: -0.5, ..base };
        assert!(matches!(p.validate(), Err(Error::TraversalCost(_))));
        let p = CollapseParams { node_traversal_cost: 0.0, ..base };
        p.validate().unwrap();
    }

    #[test]
    fn test_leaf_size_overflow() {
        let p = CollapseParams::default().with_max_leaf_size(16).unwrap();
        assert_eq!(p.max_leaf_size, 16);

        #[cfg(target_pointer_width = "64")]
        assert!(matches!(
            CollapseParams::default().with_max_leaf_size(u32::MAX as usize + 1),
            Err(Error::LeafSizeOverflow(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let p: CollapseParams = serde_json::from_str(r#"{ "max_leaf_size": 2 }"#).unwrap();
        assert_eq!(p.max_leaf_size, 2);
        assert_eq!(p.face_intersection_cost, 1.0);
        assert!(p.parallel_gather);
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let p = CollapseParams { max_leaf_size: 7, node_traversal_cost: 0.25, ..Default::default() };
        p.save(&path).unwrap();
        assert_eq!(CollapseParams::load(&path).unwrap(), p);

        assert!(matches!(
            CollapseParams::load(dir.path().join("missing.json")),
            Err(Error::FileNotFound(_))
        ));
    }
}
