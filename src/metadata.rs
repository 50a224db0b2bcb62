//! Stack metadata and physical scale

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form string tags carried alongside a stack.
///
/// Iteration order is by key, so tags round-trip deterministically through
/// the I/O layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tag, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Physical extent of a frame: first and last pixel centres plus units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub x_unit: String,
    pub y_unit: String,
}

impl Scale {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            x_unit: String::new(),
            y_unit: String::new(),
        }
    }

    /// Pixel-index scale for a frame of `x_count` by `y_count`
    pub fn pixels(x_count: usize, y_count: usize) -> Self {
        Self::new(
            0.0,
            x_count.saturating_sub(1) as f64,
            0.0,
            y_count.saturating_sub(1) as f64,
        )
    }

    /// Set the units
    pub fn with_units(mut self, x_unit: impl Into<String>, y_unit: impl Into<String>) -> Self {
        self.x_unit = x_unit.into();
        self.y_unit = y_unit.into();
        self
    }

    /// Pixel pitch along X for `x_count` pixels (0 for a single column)
    pub fn x_step(&self, x_count: usize) -> f64 {
        step(self.x_min, self.x_max, x_count)
    }

    /// Pixel pitch along Y for `y_count` pixels (0 for a single row)
    pub fn y_step(&self, y_count: usize) -> f64 {
        step(self.y_min, self.y_max, y_count)
    }

    /// X and Y swapped, units included
    pub fn transposed(&self) -> Self {
        Self {
            x_min: self.y_min,
            x_max: self.y_max,
            y_min: self.x_min,
            y_max: self.x_max,
            x_unit: self.y_unit.clone(),
            y_unit: self.x_unit.clone(),
        }
    }
}

fn step(min: f64, max: f64, count: usize) -> f64 {
    if count > 1 {
        (max - min) / (count - 1) as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_tags() {
        let mut metadata = Metadata::new();
        assert!(metadata.insert("objective", "40x").is_none());
        assert_eq!(metadata.insert("objective", "60x").as_deref(), Some("40x"));
        metadata.insert("binning", "2");

        assert_eq!(metadata.get("objective"), Some("60x"));
        let keys: Vec<&str> = metadata.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["binning", "objective"]);
        assert_eq!(metadata.remove("binning").as_deref(), Some("2"));
        assert_eq!(metadata.len(), 1);
    }

    #[test]
    fn test_scale_steps() {
        let scale = Scale::new(-10.0, 10.0, 0.0, 5.0).with_units("um", "mm");
        assert_eq!(scale.x_step(101), 0.2);
        assert_eq!(scale.y_step(6), 1.0);
        assert_eq!(scale.y_step(1), 0.0);

        let swapped = scale.transposed();
        assert_eq!(swapped.x_max, 5.0);
        assert_eq!(swapped.y_min, -10.0);
        assert_eq!(swapped.x_unit, "mm");
        assert_eq!(swapped.transposed(), scale);
    }
}
