//! Execution configuration threaded explicitly through the operators

use crate::error::{FrameError, Result};
use serde::{Deserialize, Serialize};

/// How differing axis names are treated when two dimension maps are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionStrictness {
    /// Name mismatches are logged, counts must still match
    #[default]
    Lenient,
    /// Name mismatches are rejected
    Strict,
}

/// Tunables for the parallel kernels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Use the cache-tiled strategy for Z projections
    pub projection_tiling: bool,

    /// Output elements per projection block
    pub tile_block_len: usize,

    /// Edge length of the square transpose blocks
    pub transpose_block: usize,

    /// Smallest min/max partition handed to a worker
    pub min_partition_len: usize,

    /// Axis name handling in compatibility checks
    pub dimension_strictness: DimensionStrictness,

    /// Allowed deviation, in pixels, of a tile overlap from an integer
    pub overlap_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            projection_tiling: true,
            tile_block_len: 4096,
            transpose_block: 32,
            min_partition_len: crate::minmax::DEFAULT_MIN_PARTITION_LEN,
            dimension_strictness: DimensionStrictness::Lenient,
            overlap_tolerance: 0.001,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the Z projection strategy
    pub fn with_projection_tiling(mut self, tiled: bool) -> Self {
        self.projection_tiling = tiled;
        self
    }

    /// Set the projection block length
    pub fn with_tile_block_len(mut self, len: usize) -> Self {
        self.tile_block_len = len;
        self
    }

    /// Set the transpose block edge
    pub fn with_transpose_block(mut self, block: usize) -> Self {
        self.transpose_block = block;
        self
    }

    /// Set the smallest min/max partition
    pub fn with_min_partition_len(mut self, len: usize) -> Self {
        self.min_partition_len = len;
        self
    }

    /// Set the dimension strictness
    pub fn with_dimension_strictness(mut self, strictness: DimensionStrictness) -> Self {
        self.dimension_strictness = strictness;
        self
    }

    /// Set the overlap tolerance
    pub fn with_overlap_tolerance(mut self, tolerance: f64) -> Self {
        self.overlap_tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_block_len == 0 {
            return Err(FrameError::Configuration(
                "tile_block_len must be positive".to_string(),
            ));
        }
        if self.transpose_block == 0 {
            return Err(FrameError::Configuration(
                "transpose_block must be positive".to_string(),
            ));
        }
        if self.min_partition_len == 0 {
            return Err(FrameError::Configuration(
                "min_partition_len must be positive".to_string(),
            ));
        }
        if !(self.overlap_tolerance.is_finite() && self.overlap_tolerance >= 0.0) {
            return Err(FrameError::Configuration(format!(
                "overlap_tolerance must be a non-negative number, got {}",
                self.overlap_tolerance
            )));
        }
        Ok(())
    }
}
