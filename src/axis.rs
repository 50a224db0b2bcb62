//! Named coordinate axes

use crate::error::{FrameError, Result};
use crate::fov::FovAxis;
use serde::{Deserialize, Serialize};

/// A named, ordered coordinate dimension (Channel, Z, Time, FOV, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxisRepr")]
pub struct Axis {
    name: String,
    count: usize,
    min: f64,
    max: f64,
    unit: String,
    is_index_based: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fov: Option<FovAxis>,
}

#[derive(Deserialize)]
struct AxisRepr {
    name: String,
    count: usize,
    min: f64,
    max: f64,
    unit: String,
    is_index_based: bool,
    #[serde(default)]
    fov: Option<FovAxis>,
}

impl TryFrom<AxisRepr> for Axis {
    type Error = FrameError;

    fn try_from(repr: AxisRepr) -> Result<Self> {
        if let Some(tiles) = &repr.fov {
            if tiles.tile_count() != repr.count {
                return Err(FrameError::shape(
                    format!("{} samples on FOV axis '{}'", tiles.tile_count(), repr.name),
                    format!("{} samples", repr.count),
                ));
            }
        }
        Ok(Self {
            name: repr.name,
            count: repr.count,
            min: repr.min,
            max: repr.max,
            unit: repr.unit,
            is_index_based: repr.is_index_based,
            fov: repr.fov,
        })
    }
}

impl Axis {
    /// Create a new axis spanning `min..=max` over `count` samples
    pub fn new(
        name: impl Into<String>,
        count: usize,
        min: f64,
        max: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            count,
            min,
            max,
            unit: unit.into(),
            is_index_based: false,
            fov: None,
        }
    }

    /// Axis whose coordinates are the plain indices `0..count`
    pub fn index_based(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
            min: 0.0,
            max: count.saturating_sub(1) as f64,
            unit: String::new(),
            is_index_based: true,
            fov: None,
        }
    }

    /// Index-based axis carrying per-tile world origins
    pub fn fov(name: impl Into<String>, tiles: FovAxis) -> Self {
        let mut axis = Self::index_based(name, tiles.tile_count());
        axis.fov = Some(tiles);
        axis
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn is_index_based(&self) -> bool {
        self.is_index_based
    }

    /// Tile origins, when this is a FOV axis
    pub fn fov_tiles(&self) -> Option<&FovAxis> {
        self.fov.as_ref()
    }

    /// Step between samples; undefined for fewer than two samples
    pub fn step(&self) -> Option<f64> {
        if self.count > 1 {
            Some((self.max - self.min) / (self.count - 1) as f64)
        } else {
            None
        }
    }

    /// Physical coordinate of a sample index
    pub fn value_at(&self, index: usize) -> f64 {
        match self.step() {
            Some(step) => self.min + index as f64 * step,
            None => self.min,
        }
    }

    /// Nearest sample index for a physical coordinate
    pub fn index_of(&self, value: f64) -> usize {
        let Some(step) = self.step().filter(|s| *s != 0.0) else {
            return 0;
        };
        let normalized = (value - self.min) / step;
        normalized
            .round()
            .max(0.0)
            .min((self.count - 1) as f64) as usize
    }

    /// Copy of this axis under another name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fov::TileLayout;

    #[test]
    fn test_axis_step() {
        let axis = Axis::new("Z", 101, 0.0, 1000.0, "um");
        assert_eq!(axis.step(), Some(10.0));
        assert_eq!(axis.value_at(0), 0.0);
        assert_eq!(axis.value_at(100), 1000.0);
        assert_eq!(axis.index_of(500.0), 50);
        assert_eq!(axis.index_of(-40.0), 0);
        assert_eq!(axis.index_of(5000.0), 100);
    }

    #[test]
    fn test_single_sample_axis() {
        let axis = Axis::new("Time", 1, 3.0, 3.0, "s");
        assert_eq!(axis.step(), None);
        assert_eq!(axis.value_at(0), 3.0);
        assert_eq!(axis.index_of(10.0), 0);
    }

    #[test]
    fn test_index_based_axis() {
        let axis = Axis::index_based("Channel", 4);
        assert!(axis.is_index_based());
        assert_eq!(axis.max(), 3.0);
        assert_eq!(axis.step(), Some(1.0));
        assert!(axis.fov_tiles().is_none());
    }

    #[test]
    fn test_fov_axis_count() {
        let layout = TileLayout::new(3, 2, 1).unwrap();
        let axis = Axis::fov("FOV", FovAxis::new(layout));
        assert_eq!(axis.count(), 6);
        assert_eq!(axis.fov_tiles().map(|t| t.tile_count()), Some(6));
    }

    #[test]
    fn test_deserialized_fov_count_must_match_tiles() {
        let layout = TileLayout::new(2, 2, 1).unwrap();
        let axis = Axis::fov("FOV", FovAxis::new(layout));
        let mut value = serde_json::to_value(&axis).unwrap();
        let parsed: Axis = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(parsed, axis);

        value["count"] = serde_json::json!(3);
        assert!(serde_json::from_value::<Axis>(value).is_err());

        let z = Axis::new("Z", 3, 0.0, 2.0, "um");
        let plain: Axis = serde_json::from_value(serde_json::to_value(&z).unwrap()).unwrap();
        assert_eq!(plain, z);
    }
}
