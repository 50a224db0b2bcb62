//! Tiled field-of-view geometry for mosaic stitching
//!
//! A FOV axis enumerates camera tiles laid out on an X by Y grid (tile index
//! `iy * layout.x + ix`) and stores a world-coordinate origin per tile. The
//! origin of a tile is the physical position of its first pixel, the same
//! point a tile's [`Scale`] calls `(x_min, y_min)`.

use crate::error::{FrameError, Result};
use crate::metadata::Scale;
use rayon::prelude::*;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tile grid dimensions. Stacking tiles along Z is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TileLayoutRepr")]
pub struct TileLayout {
    x: usize,
    y: usize,
    z: usize,
}

#[derive(Deserialize)]
struct TileLayoutRepr {
    x: usize,
    y: usize,
    z: usize,
}

impl TryFrom<TileLayoutRepr> for TileLayout {
    type Error = FrameError;

    fn try_from(repr: TileLayoutRepr) -> Result<Self> {
        TileLayout::new(repr.x, repr.y, repr.z)
    }
}

impl TileLayout {
    pub fn new(x: usize, y: usize, z: usize) -> Result<Self> {
        if z > 1 {
            return Err(FrameError::Unsupported(format!(
                "tile layouts stacked along Z ({} x {} x {}) are not supported",
                x, y, z
            )));
        }
        if x == 0 || y == 0 || z == 0 {
            return Err(FrameError::InvalidArgument(format!(
                "tile layout must be positive in every direction, got {} x {} x {}",
                x, y, z
            )));
        }
        Ok(Self { x, y, z })
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn z(&self) -> usize {
        self.z
    }

    pub fn tile_count(&self) -> usize {
        self.x * self.y * self.z
    }

    /// Tile index of a grid position
    pub fn index_of(&self, ix: usize, iy: usize) -> Result<usize> {
        if ix >= self.x || iy >= self.y {
            return Err(FrameError::OutOfBounds(format!(
                "tile ({}, {}) in a {} x {} layout",
                ix, iy, self.x, self.y
            )));
        }
        Ok(iy * self.x + ix)
    }

    /// Grid position of a tile index
    pub fn position_of(&self, index: usize) -> Result<(usize, usize)> {
        if index >= self.tile_count() {
            return Err(FrameError::OutOfBounds(format!(
                "tile index {} in a layout of {} tiles",
                index,
                self.tile_count()
            )));
        }
        Ok((index % self.x, index / self.x))
    }
}

/// World-coordinate origin of one tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FovOrigin {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl FovOrigin {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Pixel pitch and tile-to-tile stride of a generated mosaic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGeometry {
    pub pixel_pitch_x: f64,
    pub pixel_pitch_y: f64,
    pub stride_x: f64,
    pub stride_y: f64,
}

impl TileGeometry {
    /// Physical scale of the tile whose first pixel sits at `origin`
    pub fn tile_scale(&self, origin: FovOrigin, tile_pixels: (usize, usize)) -> Scale {
        let (x_count, y_count) = tile_pixels;
        Scale::new(
            origin.x,
            origin.x + x_count.saturating_sub(1) as f64 * self.pixel_pitch_x,
            origin.y,
            origin.y + y_count.saturating_sub(1) as f64 * self.pixel_pitch_y,
        )
    }
}

/// Neighbour direction checked by overlap validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapDirection {
    Right,
    Bottom,
}

/// Implied overlap between two adjacent tiles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileOverlap {
    pub from: usize,
    pub to: usize,
    pub direction: OverlapDirection,
    /// Overlap in pixels recovered from the origin distance
    pub implied_overlap: f64,
    /// Distance of the implied overlap from the nearest whole pixel
    pub deviation: f64,
    pub misaligned: bool,
}

/// Result of an overlap validation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapReport {
    pub pairs: Vec<TileOverlap>,
}

impl OverlapReport {
    pub fn misaligned(&self) -> impl Iterator<Item = &TileOverlap> {
        self.pairs.iter().filter(|p| p.misaligned)
    }

    pub fn is_aligned(&self) -> bool {
        self.pairs.iter().all(|p| !p.misaligned)
    }

    /// Largest deviation from a whole-pixel overlap
    pub fn max_deviation(&self) -> f64 {
        self.pairs.iter().map(|p| p.deviation).fold(0.0, f64::max)
    }
}

/// Per-tile origins of a FOV axis. Holds exactly one origin per tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FovAxisRepr")]
pub struct FovAxis {
    layout: TileLayout,
    origins: Vec<FovOrigin>,
}

#[derive(Deserialize)]
struct FovAxisRepr {
    layout: TileLayout,
    origins: Vec<FovOrigin>,
}

impl TryFrom<FovAxisRepr> for FovAxis {
    type Error = FrameError;

    fn try_from(repr: FovAxisRepr) -> Result<Self> {
        FovAxis::with_origins(repr.layout, repr.origins)
    }
}

impl FovAxis {
    /// All origins at zero
    pub fn new(layout: TileLayout) -> Self {
        Self {
            origins: vec![FovOrigin::default(); layout.tile_count()],
            layout,
        }
    }

    pub fn with_origins(layout: TileLayout, origins: Vec<FovOrigin>) -> Result<Self> {
        if origins.len() != layout.tile_count() {
            return Err(FrameError::shape(
                format!("{} origins", layout.tile_count()),
                format!("{} origins", origins.len()),
            ));
        }
        Ok(Self { layout, origins })
    }

    /// Place every tile relative to one tile's known scale.
    ///
    /// Neighbouring tiles are `pitch * (tile_extent - pixel_overlap)` apart;
    /// tiles left of or above the base tile get negative offsets.
    pub fn extended_from_one_tile(
        layout: TileLayout,
        tile_scale: &Scale,
        tile_pixels: (usize, usize),
        pixel_overlap: usize,
        base_index: usize,
    ) -> Result<Self> {
        let (x_count, y_count) = tile_pixels;
        check_tile_pixels(tile_pixels, pixel_overlap)?;
        let (base_x, base_y) = layout.position_of(base_index)?;

        let stride_x = tile_scale.x_step(x_count) * (x_count - pixel_overlap) as f64;
        let stride_y = tile_scale.y_step(y_count) * (y_count - pixel_overlap) as f64;

        let origins = (0..layout.tile_count())
            .map(|index| {
                let (ix, iy) = (index % layout.x, index / layout.x);
                let dx = ix as f64 - base_x as f64;
                let dy = iy as f64 - base_y as f64;
                FovOrigin::new(
                    tile_scale.x_min + dx * stride_x,
                    tile_scale.y_min + dy * stride_y,
                    0.0,
                )
            })
            .collect();
        Ok(Self { layout, origins })
    }

    /// Split a total physical area into the tile grid.
    ///
    /// Solves for the pixel pitch at which `layout.x` tiles of `tile_pixels`
    /// sharing `pixel_overlap` pixels span exactly `total`. The arithmetic
    /// runs in decimal and only the final coordinates are converted to `f64`.
    pub fn subdivided_from_total_area(
        layout: TileLayout,
        total: &Scale,
        tile_pixels: (usize, usize),
        pixel_overlap: usize,
    ) -> Result<(Self, TileGeometry)> {
        let (x_count, y_count) = tile_pixels;
        check_tile_pixels(tile_pixels, pixel_overlap)?;

        let span_x = layout.x * x_count - (layout.x - 1) * pixel_overlap;
        let span_y = layout.y * y_count - (layout.y - 1) * pixel_overlap;

        let x_min = to_decimal(total.x_min)?;
        let y_min = to_decimal(total.y_min)?;
        let pitch_x = checked_div(to_decimal(total.x_max)? - x_min, Decimal::from(span_x - 1))?;
        let pitch_y = checked_div(to_decimal(total.y_max)? - y_min, Decimal::from(span_y - 1))?;
        let stride_x = checked_mul(pitch_x, Decimal::from(x_count - pixel_overlap))?;
        let stride_y = checked_mul(pitch_y, Decimal::from(y_count - pixel_overlap))?;

        let mut origins = Vec::with_capacity(layout.tile_count());
        for index in 0..layout.tile_count() {
            let (ix, iy) = (index % layout.x, index / layout.x);
            let x = x_min + checked_mul(stride_x, Decimal::from(ix))?;
            let y = y_min + checked_mul(stride_y, Decimal::from(iy))?;
            origins.push(FovOrigin::new(from_decimal(x)?, from_decimal(y)?, 0.0));
        }

        let geometry = TileGeometry {
            pixel_pitch_x: from_decimal(pitch_x)?,
            pixel_pitch_y: from_decimal(pitch_y)?,
            stride_x: from_decimal(stride_x)?,
            stride_y: from_decimal(stride_y)?,
        };
        Ok((Self { layout, origins }, geometry))
    }

    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    pub fn tile_count(&self) -> usize {
        self.origins.len()
    }

    pub fn origins(&self) -> &[FovOrigin] {
        &self.origins
    }

    pub fn origin(&self, index: usize) -> Result<FovOrigin> {
        self.origins.get(index).copied().ok_or_else(|| {
            FrameError::OutOfBounds(format!(
                "tile index {} in a layout of {} tiles",
                index,
                self.origins.len()
            ))
        })
    }

    /// Move one tile, returning its previous origin
    pub fn set_origin(&mut self, index: usize, origin: FovOrigin) -> Result<FovOrigin> {
        let previous = self.origin(index)?;
        self.origins[index] = origin;
        Ok(previous)
    }

    /// Check that every right and bottom neighbour pair overlaps by a whole
    /// number of pixels, within `tolerance` pixels.
    pub fn validate_pixel_overlap(
        &self,
        pixel_pitch: (f64, f64),
        tile_pixels: (usize, usize),
        tolerance: f64,
    ) -> Result<OverlapReport> {
        let (pitch_x, pitch_y) = pixel_pitch;
        if !(pitch_x > 0.0 && pitch_y > 0.0) {
            return Err(FrameError::InvalidArgument(format!(
                "pixel pitch must be positive, got ({}, {})",
                pitch_x, pitch_y
            )));
        }
        let (x_count, y_count) = tile_pixels;
        let layout = self.layout;

        let pairs: Vec<TileOverlap> = (0..self.origins.len())
            .into_par_iter()
            .flat_map_iter(|index| {
                let (ix, iy) = (index % layout.x, index / layout.x);
                let here = self.origins[index];
                let mut found = Vec::with_capacity(2);
                if ix + 1 < layout.x {
                    let to = index + 1;
                    let shift = (self.origins[to].x - here.x) / pitch_x;
                    found.push(overlap_pair(index, to, OverlapDirection::Right, x_count, shift, tolerance));
                }
                if iy + 1 < layout.y {
                    let to = index + layout.x;
                    let shift = (self.origins[to].y - here.y) / pitch_y;
                    found.push(overlap_pair(index, to, OverlapDirection::Bottom, y_count, shift, tolerance));
                }
                found
            })
            .collect();

        let report = OverlapReport { pairs };
        for pair in report.misaligned() {
            warn!(
                from = pair.from,
                to = pair.to,
                direction = ?pair.direction,
                implied_overlap = pair.implied_overlap,
                "sub-pixel tile misalignment"
            );
        }
        Ok(report)
    }
}

fn overlap_pair(
    from: usize,
    to: usize,
    direction: OverlapDirection,
    extent: usize,
    shift: f64,
    tolerance: f64,
) -> TileOverlap {
    let implied_overlap = extent as f64 - shift;
    let deviation = (implied_overlap - implied_overlap.round()).abs();
    TileOverlap {
        from,
        to,
        direction,
        implied_overlap,
        deviation,
        misaligned: deviation > tolerance,
    }
}

fn check_tile_pixels(tile_pixels: (usize, usize), pixel_overlap: usize) -> Result<()> {
    let (x_count, y_count) = tile_pixels;
    if x_count < 2 || y_count < 2 {
        return Err(FrameError::InvalidArgument(format!(
            "tiles need at least 2 x 2 pixels to define a pitch, got {} x {}",
            x_count, y_count
        )));
    }
    if pixel_overlap >= x_count.min(y_count) {
        return Err(FrameError::InvalidArgument(format!(
            "overlap of {} pixels does not fit a {} x {} tile",
            pixel_overlap, x_count, y_count
        )));
    }
    Ok(())
}

fn to_decimal(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| {
        FrameError::InvalidArgument(format!("{} has no decimal representation", value))
    })
}

fn from_decimal(value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| FrameError::InvalidArgument(format!("{} does not fit an f64", value)))
}

fn checked_div(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_div(rhs)
        .ok_or_else(|| FrameError::InvalidArgument(format!("cannot divide {} by {}", lhs, rhs)))
}

fn checked_mul(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_mul(rhs)
        .ok_or_else(|| FrameError::InvalidArgument(format!("{} * {} overflows", lhs, rhs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_layout_rejects_z_tiling() {
        let err = TileLayout::new(2, 2, 2).unwrap_err();
        assert!(matches!(err, FrameError::Unsupported(_)));
        assert!(TileLayout::new(0, 2, 1).is_err());

        let parsed: std::result::Result<TileLayout, _> =
            serde_json::from_str(r#"{ "x": 3, "y": 3, "z": 4 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_layout_positions() {
        let layout = TileLayout::new(3, 2, 1).unwrap();
        assert_eq!(layout.index_of(2, 1).unwrap(), 5);
        assert_eq!(layout.position_of(4).unwrap(), (1, 1));
        assert!(layout.position_of(6).is_err());
    }

    #[test]
    fn test_extended_from_one_tile() {
        let layout = TileLayout::new(3, 3, 1).unwrap();
        let tile = Scale::new(100.0, 109.9, 50.0, 59.9);
        let fov = FovAxis::extended_from_one_tile(layout, &tile, (100, 100), 10, 4).unwrap();

        // the base tile keeps its own origin
        assert_eq!(fov.origin(4).unwrap(), FovOrigin::new(100.0, 50.0, 0.0));
        let top_left = fov.origin(0).unwrap();
        assert_abs_diff_eq!(top_left.x, 100.0 - 0.1 * 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(top_left.y, 50.0 - 0.1 * 90.0, epsilon = 1e-9);
        let right = fov.origin(5).unwrap();
        assert_abs_diff_eq!(right.x, 109.0, epsilon = 1e-9);
    }

    #[test]
    fn test_generated_overlap_validates() {
        for overlap in [0usize, 1, 7, 25] {
            let layout = TileLayout::new(4, 3, 1).unwrap();
            let tile = Scale::new(-3.7, -3.7 + 127.0 * 0.325, 12.1, 12.1 + 95.0 * 0.325);
            let fov = FovAxis::extended_from_one_tile(layout, &tile, (128, 96), overlap, 5).unwrap();
            let report = fov
                .validate_pixel_overlap((tile.x_step(128), tile.y_step(96)), (128, 96), 0.001)
                .unwrap();

            assert_eq!(report.pairs.len(), 3 * 3 + 4 * 2);
            for pair in &report.pairs {
                assert_abs_diff_eq!(pair.implied_overlap, overlap as f64, epsilon = 0.001);
            }
            assert!(report.is_aligned());
        }
    }

    #[test]
    fn test_misaligned_tile_flagged() {
        let layout = TileLayout::new(2, 1, 1).unwrap();
        let tile = Scale::new(0.0, 99.0, 0.0, 99.0);
        let mut fov = FovAxis::extended_from_one_tile(layout, &tile, (100, 100), 5, 0).unwrap();
        let previous = fov.set_origin(1, FovOrigin::new(95.4, 0.0, 0.0)).unwrap();
        assert_eq!(previous, FovOrigin::new(95.0, 0.0, 0.0));

        let report = fov.validate_pixel_overlap((1.0, 1.0), (100, 100), 0.001).unwrap();
        assert!(!report.is_aligned());
        let bad: Vec<_> = report.misaligned().collect();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].direction, OverlapDirection::Right);
        assert_abs_diff_eq!(bad[0].deviation, 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_subdivided_spans_total_area() {
        let layout = TileLayout::new(5, 4, 1).unwrap();
        let total = Scale::new(0.0, 1000.0, -200.0, 600.0);
        let (fov, geometry) =
            FovAxis::subdivided_from_total_area(layout, &total, (512, 256), 32).unwrap();

        let last = fov.origin(fov.tile_count() - 1).unwrap();
        let last_scale = geometry.tile_scale(last, (512, 256));
        assert_abs_diff_eq!(last_scale.x_max, 1000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(last_scale.y_max, 600.0, epsilon = 1e-9);
        assert_eq!(fov.origin(0).unwrap(), FovOrigin::new(0.0, -200.0, 0.0));

        let report = fov
            .validate_pixel_overlap(
                (geometry.pixel_pitch_x, geometry.pixel_pitch_y),
                (512, 256),
                0.001,
            )
            .unwrap();
        assert!(report.is_aligned());
        assert!(report.max_deviation() < 0.001);
    }

    #[test]
    fn test_invalid_tile_arguments() {
        let layout = TileLayout::new(2, 2, 1).unwrap();
        let tile = Scale::new(0.0, 10.0, 0.0, 10.0);
        assert!(FovAxis::extended_from_one_tile(layout, &tile, (11, 11), 11, 0).is_err());
        assert!(FovAxis::extended_from_one_tile(layout, &tile, (1, 11), 0, 0).is_err());
        assert!(FovAxis::extended_from_one_tile(layout, &tile, (11, 11), 0, 4).is_err());
        assert!(FovAxis::with_origins(layout, vec![FovOrigin::default(); 3]).is_err());

        let fov = FovAxis::new(layout);
        assert!(fov.validate_pixel_overlap((0.0, 1.0), (11, 11), 0.001).is_err());
    }

    #[test]
    fn test_deserialize_checks_origin_count() {
        let short = r#"{
            "layout": { "x": 2, "y": 2, "z": 1 },
            "origins": [
                { "x": 0.0, "y": 0.0, "z": 0.0 },
                { "x": 9.0, "y": 0.0, "z": 0.0 },
                { "x": 0.0, "y": 9.0, "z": 0.0 }
            ]
        }"#;
        assert!(serde_json::from_str::<FovAxis>(short).is_err());

        let layout = TileLayout::new(2, 2, 1).unwrap();
        let tile = Scale::new(0.0, 9.0, 0.0, 9.0);
        let fov = FovAxis::extended_from_one_tile(layout, &tile, (10, 10), 1, 0).unwrap();
        let json = serde_json::to_string(&fov).unwrap();
        let parsed: FovAxis = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, fov);
        let report = parsed.validate_pixel_overlap((1.0, 1.0), (10, 10), 0.001).unwrap();
        assert_eq!(report.pairs.len(), 4);
        assert!(report.is_aligned());
    }
}
