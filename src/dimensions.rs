//! Dimension map - the stride system between axis coordinates and flat frame indices
//!
//! Axes are kept in list order. Axis 0 varies fastest (stride 1); every later
//! axis has a stride equal to the product of the counts before it.

use crate::axis::Axis;
use crate::config::DimensionStrictness;
use crate::error::{FrameError, Result};
use std::collections::HashSet;
use std::fmt;
use std::ops::Index;
use tracing::warn;

/// Ordered axis list plus its strides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dimensions {
    axes: Vec<Axis>,
    strides: Vec<usize>,
}

/// Running product of counts, left to right
pub fn compute_strides(counts: &[usize]) -> Vec<usize> {
    let mut strides = Vec::with_capacity(counts.len());
    let mut running = 1;
    for &count in counts {
        strides.push(running);
        running *= count;
    }
    strides
}

impl Dimensions {
    /// Dimension-less map (a flat frame list)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dimension map over `frame_count` frames.
    ///
    /// An empty axis list yields a dimension-less map.
    pub fn new(axes: Vec<Axis>, frame_count: usize) -> Result<Self> {
        if axes.is_empty() {
            return Ok(Self::empty());
        }

        let mut seen = HashSet::new();
        for axis in &axes {
            if axis.count() == 0 {
                return Err(FrameError::InvalidArgument(format!(
                    "axis '{}' has a count of zero",
                    axis.name()
                )));
            }
            if !seen.insert(axis.name()) {
                return Err(FrameError::InvalidOperation(format!(
                    "axis '{}' is defined more than once",
                    axis.name()
                )));
            }
        }

        let product: usize = axes.iter().map(|a| a.count()).product();
        if product != frame_count {
            return Err(FrameError::InvalidOperation(format!(
                "axis counts [{}] multiply to {} but the stack holds {} frames",
                describe_counts(&axes),
                product,
                frame_count
            )));
        }

        let counts: Vec<usize> = axes.iter().map(|a| a.count()).collect();
        Ok(Self {
            strides: compute_strides(&counts),
            axes,
        })
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Number of frames addressed by the map, `None` when dimension-less
    pub fn frame_count(&self) -> Option<usize> {
        if self.axes.is_empty() {
            None
        } else {
            Some(self.axes.iter().map(|a| a.count()).product())
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.axes.iter().any(|a| a.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.name() == name)
    }

    /// Axis by name, failing when absent
    pub fn axis(&self, name: &str) -> Result<&Axis> {
        self.get(name)
            .ok_or_else(|| FrameError::AxisNotFound(self.missing(name)))
    }

    /// Position of the named axis in the list
    pub fn axis_order(&self, name: &str) -> Result<usize> {
        self.axes
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| FrameError::AxisNotFound(self.missing(name)))
    }

    /// Count of the named axis, 0 when absent
    pub fn length(&self, name: &str) -> usize {
        self.get(name).map(|a| a.count()).unwrap_or(0)
    }

    /// Flat frame index of an axis-coordinate tuple (list order)
    pub fn frame_index_from(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.axes.len() {
            return Err(FrameError::shape(
                format!("{} coordinates", self.axes.len()),
                format!("{} coordinates", coords.len()),
            ));
        }

        let mut index = 0;
        for ((axis, &coord), &stride) in self.axes.iter().zip(coords).zip(&self.strides) {
            if coord >= axis.count() {
                return Err(FrameError::OutOfBounds(format!(
                    "coordinate {} on axis '{}' (count {})",
                    coord,
                    axis.name(),
                    axis.count()
                )));
            }
            index += coord * stride;
        }
        Ok(index)
    }

    /// Axis-coordinate tuple of a flat frame index
    pub fn axis_indices(&self, frame_index: usize) -> Result<Vec<usize>> {
        let total = self.frame_count().unwrap_or(0);
        if frame_index >= total {
            return Err(FrameError::OutOfBounds(format!(
                "frame index {} for a dimension map of {} frames",
                frame_index, total
            )));
        }

        Ok(self
            .axes
            .iter()
            .zip(&self.strides)
            .map(|(axis, &stride)| (frame_index / stride) % axis.count())
            .collect())
    }

    /// Axis list with the named axis removed
    pub fn axes_without(&self, name: &str) -> Result<Vec<Axis>> {
        let order = self.axis_order(name)?;
        Ok(self
            .axes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != order)
            .map(|(_, a)| a.clone())
            .collect())
    }

    /// Every frame index whose coordinate on `name` equals `index`, ascending
    pub fn indices_for_slice(&self, name: &str, index: usize) -> Result<Vec<usize>> {
        let order = self.axis_order(name)?;
        let axis = &self.axes[order];
        if index >= axis.count() {
            return Err(FrameError::OutOfBounds(format!(
                "index {} on axis '{}' (count {})",
                index,
                name,
                axis.count()
            )));
        }

        let stride = self.strides[order];
        let total = self.frame_count().unwrap_or(0);
        Ok((0..total)
            .filter(|f| (f / stride) % axis.count() == index)
            .collect())
    }

    /// Check that `names` is a permutation of the existing axis names.
    ///
    /// Returns, for each new position, the old position of that axis.
    pub fn validate_permutation(&self, names: &[&str]) -> Result<Vec<usize>> {
        if names.len() != self.axes.len() {
            return Err(FrameError::InvalidOperation(format!(
                "axis order names {} axes but the map has {} ({})",
                names.len(),
                self.axes.len(),
                self
            )));
        }

        let mut seen = HashSet::new();
        let mut old_positions = Vec::with_capacity(names.len());
        for &name in names {
            if !seen.insert(name) {
                return Err(FrameError::InvalidOperation(format!(
                    "axis '{}' appears more than once in the new order",
                    name
                )));
            }
            let pos = self.axes.iter().position(|a| a.name() == name).ok_or_else(|| {
                FrameError::InvalidOperation(format!(
                    "axis '{}' is not part of the map ({})",
                    name, self
                ))
            })?;
            old_positions.push(pos);
        }
        Ok(old_positions)
    }

    /// Check that two maps describe the same shape.
    ///
    /// Axis and per-axis counts must match. Differing names are rejected
    /// under [`DimensionStrictness::Strict`] and only logged otherwise.
    pub fn check_compatible(&self, other: &Dimensions, strictness: DimensionStrictness) -> Result<()> {
        if self.axes.len() != other.axes.len() {
            return Err(FrameError::shape(
                format!("{} axes ({})", self.axes.len(), self),
                format!("{} axes ({})", other.axes.len(), other),
            ));
        }

        for (mine, theirs) in self.axes.iter().zip(&other.axes) {
            if mine.count() != theirs.count() {
                return Err(FrameError::shape(
                    format!("axis '{}' with {} entries", mine.name(), mine.count()),
                    format!("axis '{}' with {} entries", theirs.name(), theirs.count()),
                ));
            }
            if mine.name() != theirs.name() {
                match strictness {
                    DimensionStrictness::Strict => {
                        return Err(FrameError::InvalidOperation(format!(
                            "axis name '{}' does not match '{}'",
                            mine.name(),
                            theirs.name()
                        )));
                    }
                    DimensionStrictness::Lenient => {
                        warn!(
                            left = mine.name(),
                            right = theirs.name(),
                            "axis names differ between otherwise compatible dimensions"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn missing(&self, name: &str) -> String {
        if self.axes.is_empty() {
            format!("'{}' (the stack has no dimensions)", name)
        } else {
            format!("'{}' (available: {})", name, self)
        }
    }
}

impl Index<&str> for Dimensions {
    type Output = Axis;

    /// Panics when the axis is absent; use [`Dimensions::axis`] to handle that case.
    fn index(&self, name: &str) -> &Axis {
        match self.get(name) {
            Some(axis) => axis,
            None => panic!("axis {} not found", self.missing(name)),
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.axes.is_empty() {
            return write!(f, "none");
        }
        let parts: Vec<String> = self
            .axes
            .iter()
            .map(|a| format!("{}[{}]", a.name(), a.count()))
            .collect();
        write!(f, "{}", parts.join(" x "))
    }
}

fn describe_counts(axes: &[Axis]) -> String {
    axes.iter()
        .map(|a| a.count().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dimensions() -> Dimensions {
        let axes = vec![
            Axis::index_based("Channel", 3),
            Axis::new("Z", 4, 0.0, 3.0, "um"),
            Axis::new("Time", 2, 0.0, 10.0, "s"),
        ];
        Dimensions::new(axes, 24).unwrap()
    }

    #[test]
    fn test_strides() {
        let dims = create_test_dimensions();
        assert_eq!(dims.strides(), &[1, 3, 12]);
        assert_eq!(dims.frame_count(), Some(24));
        assert_eq!(compute_strides(&[]), Vec::<usize>::new());
    }

    #[test]
    fn test_frame_count_mismatch() {
        let axes = vec![Axis::index_based("Channel", 3), Axis::index_based("Z", 4)];
        let err = Dimensions::new(axes, 13).unwrap_err();
        assert!(matches!(err, FrameError::InvalidOperation(_)));
        assert!(err.is_structural());
    }

    #[test]
    fn test_duplicate_and_zero_axes() {
        let dup = vec![Axis::index_based("Z", 2), Axis::index_based("Z", 2)];
        assert!(matches!(
            Dimensions::new(dup, 4),
            Err(FrameError::InvalidOperation(_))
        ));
        let zero = vec![Axis::index_based("Z", 0)];
        assert!(matches!(
            Dimensions::new(zero, 0),
            Err(FrameError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_index_conversion() {
        let dims = create_test_dimensions();
        let coords = vec![2, 3, 1];
        let index = dims.frame_index_from(&coords).unwrap();
        assert_eq!(index, 2 + 3 * 3 + 12);
        assert_eq!(dims.axis_indices(index).unwrap(), coords);

        for f in 0..24 {
            let c = dims.axis_indices(f).unwrap();
            assert_eq!(dims.frame_index_from(&c).unwrap(), f);
        }
    }

    #[test]
    fn test_index_errors() {
        let dims = create_test_dimensions();
        assert!(matches!(
            dims.frame_index_from(&[0, 4, 0]),
            Err(FrameError::OutOfBounds(_))
        ));
        assert!(matches!(
            dims.frame_index_from(&[0, 0]),
            Err(FrameError::ShapeMismatch { .. })
        ));
        assert!(dims.axis_indices(24).is_err());
    }

    #[test]
    fn test_lookup() {
        let dims = create_test_dimensions();
        assert!(dims.contains("Z"));
        assert!(!dims.contains("FOV"));
        assert_eq!(dims["Time"].count(), 2);
        assert_eq!(dims.axis_order("Time").unwrap(), 2);
        assert_eq!(dims.length("Z"), 4);
        assert_eq!(dims.length("FOV"), 0);
        assert!(matches!(dims.axis("FOV"), Err(FrameError::AxisNotFound(_))));
        assert_eq!(dims.to_string(), "Channel[3] x Z[4] x Time[2]");
    }

    #[test]
    fn test_axes_without() {
        let dims = create_test_dimensions();
        let rest = dims.axes_without("Z").unwrap();
        let names: Vec<&str> = rest.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["Channel", "Time"]);
        assert!(dims.axes_without("FOV").is_err());
    }

    #[test]
    fn test_indices_for_slice() {
        let dims = create_test_dimensions();
        let slice = dims.indices_for_slice("Time", 1).unwrap();
        assert_eq!(slice, (12..24).collect::<Vec<_>>());

        let slice = dims.indices_for_slice("Z", 2).unwrap();
        assert_eq!(slice, vec![6, 7, 8, 18, 19, 20]);

        let slice = dims.indices_for_slice("Channel", 0).unwrap();
        assert_eq!(slice.len(), 8);
        assert!(slice.iter().all(|f| f % 3 == 0));

        assert!(matches!(
            dims.indices_for_slice("Z", 4),
            Err(FrameError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_validate_permutation() {
        let dims = create_test_dimensions();
        assert_eq!(
            dims.validate_permutation(&["Time", "Channel", "Z"]).unwrap(),
            vec![2, 0, 1]
        );
        assert!(dims.validate_permutation(&["Time", "Channel"]).is_err());
        assert!(dims.validate_permutation(&["Time", "Time", "Z"]).is_err());
        assert!(dims.validate_permutation(&["Time", "Channel", "FOV"]).is_err());
    }

    #[test]
    fn test_check_compatible() {
        let dims = create_test_dimensions();
        let renamed = Dimensions::new(
            vec![
                Axis::index_based("C", 3),
                Axis::index_based("Z", 4),
                Axis::index_based("T", 2),
            ],
            24,
        )
        .unwrap();
        assert!(dims.check_compatible(&renamed, DimensionStrictness::Lenient).is_ok());
        assert!(dims.check_compatible(&renamed, DimensionStrictness::Strict).is_err());

        let other_shape =
            Dimensions::new(vec![Axis::index_based("Channel", 24)], 24).unwrap();
        assert!(matches!(
            dims.check_compatible(&other_shape, DimensionStrictness::Lenient),
            Err(FrameError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_dimensions() {
        let dims = Dimensions::new(Vec::new(), 7).unwrap();
        assert!(dims.is_empty());
        assert_eq!(dims.frame_count(), None);
        assert_eq!(dims.to_string(), "none");
    }
}
