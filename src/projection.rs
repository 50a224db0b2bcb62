//! Intensity projections (MIP, MinIP, AIP) along X, Y or the frame axis
//!
//! Z projections come in two strategies. `Naive` walks every frame for each
//! output pixel. `Tiled` splits the output plane into contiguous blocks and
//! sweeps all frames over one block at a time, so the block stays cache
//! resident across the whole depth. Blocks are the unit of parallelism.

use crate::config::EngineConfig;
use crate::error::{FrameError, Result};
use crate::metadata::Scale;
use crate::stack::FrameStack;
use crate::types::Element;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of output elements per tiled block
pub const DEFAULT_BLOCK_LEN: usize = 4096;

/// Projection statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionMode {
    Maximum,
    Minimum,
    Average,
}

/// Axis collapsed by a projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionAxis {
    X,
    Y,
    /// The frame axis
    Z,
}

impl fmt::Display for ProjectionAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionAxis::X => write!(f, "X"),
            ProjectionAxis::Y => write!(f, "Y"),
            ProjectionAxis::Z => write!(f, "Z"),
        }
    }
}

/// Iteration order for Z projections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionStrategy {
    Naive,
    Tiled { block_len: usize },
}

impl ProjectionStrategy {
    pub fn from_config(config: &EngineConfig) -> Self {
        if config.projection_tiling {
            ProjectionStrategy::Tiled {
                block_len: config.tile_block_len,
            }
        } else {
            ProjectionStrategy::Naive
        }
    }
}

impl Default for ProjectionStrategy {
    fn default() -> Self {
        ProjectionStrategy::Tiled {
            block_len: DEFAULT_BLOCK_LEN,
        }
    }
}

/// Element types that can be projected.
///
/// Complex elements have no ordering and do not implement this trait.
pub trait Projectable: Element + PartialOrd {
    /// Seed for maximum projections
    const LOWEST: Self;

    /// Seed for minimum projections
    const HIGHEST: Self;

    fn to_f64(self) -> f64;

    /// Round and saturate back from an averaged value
    fn from_f64_saturating(value: f64) -> Self;
}

macro_rules! impl_projectable_int {
    ($($t:ty),*) => {
        $(
            impl Projectable for $t {
                const LOWEST: Self = <$t>::MIN;
                const HIGHEST: Self = <$t>::MAX;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64_saturating(value: f64) -> Self {
                    // float to int `as` saturates and maps NaN to 0
                    value.round() as $t
                }
            }
        )*
    };
}

impl_projectable_int!(u8, u16, u32, u64, i8, i16, i32, i64);

macro_rules! impl_projectable_float {
    ($($t:ty),*) => {
        $(
            impl Projectable for $t {
                const LOWEST: Self = <$t>::NEG_INFINITY;
                const HIGHEST: Self = <$t>::INFINITY;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64_saturating(value: f64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_projectable_float!(f32, f64);

impl ProjectionMode {
    fn seed<T: Projectable>(self) -> T {
        match self {
            ProjectionMode::Maximum => T::LOWEST,
            ProjectionMode::Minimum => T::HIGHEST,
            ProjectionMode::Average => T::default(),
        }
    }

    /// Fold one value into a running extremum
    #[inline]
    fn pick<T: Projectable>(self, current: T, value: T) -> T {
        match self {
            ProjectionMode::Maximum if value > current => value,
            ProjectionMode::Minimum if value < current => value,
            _ => current,
        }
    }
}

/// Read-only width by height by depth view over a list of frames
#[derive(Debug, Clone)]
pub struct VolumeView<'a, T> {
    frames: Vec<&'a [T]>,
    width: usize,
    height: usize,
}

impl<'a, T: Projectable> VolumeView<'a, T> {
    pub fn new(frames: Vec<&'a [T]>, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidArgument(format!(
                "volume plane must be positive, got {} x {}",
                width, height
            )));
        }
        if let Some((z, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.len() != width * height)
        {
            return Err(FrameError::shape(
                format!("{} elements per frame", width * height),
                format!("{} elements at depth {}", frame.len(), z),
            ));
        }
        Ok(Self {
            frames,
            width,
            height,
        })
    }

    pub fn from_stack(stack: &'a FrameStack<T>) -> Self {
        Self {
            frames: stack.frames().collect(),
            width: stack.x_count(),
            height: stack.y_count(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Project along the frame axis into a `width * height` plane
    pub fn project_z(&self, mode: ProjectionMode, strategy: ProjectionStrategy) -> Result<Vec<T>> {
        self.check_depth()?;
        match strategy {
            ProjectionStrategy::Naive => Ok(self.project_z_naive(mode)),
            ProjectionStrategy::Tiled { block_len } => {
                if block_len == 0 {
                    return Err(FrameError::InvalidArgument(
                        "projection block length must be positive".to_string(),
                    ));
                }
                Ok(self.project_z_tiled(mode, block_len))
            }
        }
    }

    fn project_z_naive(&self, mode: ProjectionMode) -> Vec<T> {
        let depth = self.depth() as f64;
        let mut out = vec![T::default(); self.width * self.height];
        out.par_chunks_mut(self.width)
            .enumerate()
            .for_each(|(iy, row)| {
                let offset = iy * self.width;
                for (ix, value) in row.iter_mut().enumerate() {
                    let p = offset + ix;
                    *value = match mode {
                        ProjectionMode::Average => {
                            let sum: f64 = self.frames.iter().map(|f| f[p].to_f64()).sum();
                            T::from_f64_saturating(sum / depth)
                        }
                        _ => self
                            .frames
                            .iter()
                            .fold(mode.seed(), |acc, f| mode.pick(acc, f[p])),
                    };
                }
            });
        out
    }

    fn project_z_tiled(&self, mode: ProjectionMode, block_len: usize) -> Vec<T> {
        let depth = self.depth() as f64;
        let mut out = vec![T::default(); self.width * self.height];
        out.par_chunks_mut(block_len)
            .enumerate()
            .for_each(|(b, block)| {
                let offset = b * block_len;
                let range = offset..offset + block.len();
                match mode {
                    ProjectionMode::Average => {
                        let mut sums = vec![0.0f64; block.len()];
                        for frame in &self.frames {
                            for (sum, &v) in sums.iter_mut().zip(&frame[range.clone()]) {
                                *sum += v.to_f64();
                            }
                        }
                        for (value, sum) in block.iter_mut().zip(sums) {
                            *value = T::from_f64_saturating(sum / depth);
                        }
                    }
                    _ => {
                        block.fill(mode.seed());
                        for frame in &self.frames {
                            for (value, &v) in block.iter_mut().zip(&frame[range.clone()]) {
                                *value = mode.pick(*value, v);
                            }
                        }
                    }
                }
            });
        out
    }

    /// Project along Y into a `width` by `depth` plane (row `z` from frame `z`)
    pub fn project_y(&self, mode: ProjectionMode) -> Result<Vec<T>> {
        self.check_depth()?;
        let (width, height) = (self.width, self.height);
        let mut out = vec![T::default(); width * self.depth()];
        out.par_chunks_mut(width)
            .zip(self.frames.par_iter())
            .for_each(|(row, frame)| match mode {
                ProjectionMode::Average => {
                    let mut sums = vec![0.0f64; width];
                    for line in frame.chunks_exact(width) {
                        for (sum, &v) in sums.iter_mut().zip(line) {
                            *sum += v.to_f64();
                        }
                    }
                    for (value, sum) in row.iter_mut().zip(sums) {
                        *value = T::from_f64_saturating(sum / height as f64);
                    }
                }
                _ => {
                    row.fill(mode.seed());
                    for line in frame.chunks_exact(width) {
                        for (value, &v) in row.iter_mut().zip(line) {
                            *value = mode.pick(*value, v);
                        }
                    }
                }
            });
        Ok(out)
    }

    /// Project along X into a `height` by `depth` plane (row `z` from frame `z`)
    pub fn project_x(&self, mode: ProjectionMode) -> Result<Vec<T>> {
        self.check_depth()?;
        let (width, height) = (self.width, self.height);
        let mut out = vec![T::default(); height * self.depth()];
        out.par_chunks_mut(height)
            .zip(self.frames.par_iter())
            .for_each(|(row, frame)| {
                for (value, line) in row.iter_mut().zip(frame.chunks_exact(width)) {
                    *value = match mode {
                        ProjectionMode::Average => {
                            let sum: f64 = line.iter().map(|v| v.to_f64()).sum();
                            T::from_f64_saturating(sum / width as f64)
                        }
                        _ => line.iter().fold(mode.seed(), |acc, &v| mode.pick(acc, v)),
                    };
                }
            });
        Ok(out)
    }

    fn check_depth(&self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(FrameError::InvalidOperation(
                "cannot project a volume without frames".to_string(),
            ));
        }
        Ok(())
    }
}

impl<T: Projectable> FrameStack<T> {
    /// Project the stack along `axis` with the Z strategy taken from `config`
    pub fn project_with(&self, axis: ProjectionAxis, mode: ProjectionMode, config: &EngineConfig) -> Result<FrameStack<T>> {
        self.project(axis, mode, ProjectionStrategy::from_config(config))
    }

    /// Project all frames into a single-frame stack.
    ///
    /// Z projections keep the XY scale. X and Y projections put the depth on
    /// the output Y axis, scaled by the single dimension axis when there is
    /// one and by frame index otherwise. `strategy` only affects Z.
    #[instrument(skip(self), fields(frames = self.frame_count()))]
    pub fn project(&self, axis: ProjectionAxis, mode: ProjectionMode, strategy: ProjectionStrategy) -> Result<FrameStack<T>> {
        let view = VolumeView::from_stack(self);
        let depth = view.depth();
        let scale = self.scale();

        let (data, width, height, out_scale) = match axis {
            ProjectionAxis::Z => {
                debug!(?strategy, "z projection strategy");
                let data = view.project_z(mode, strategy)?;
                (data, self.x_count(), self.y_count(), scale.clone())
            }
            ProjectionAxis::Y => {
                let data = view.project_y(mode)?;
                let (d_min, d_max, d_unit) = self.depth_scale();
                let out_scale = Scale::new(scale.x_min, scale.x_max, d_min, d_max)
                    .with_units(scale.x_unit.clone(), d_unit);
                (data, self.x_count(), depth, out_scale)
            }
            ProjectionAxis::X => {
                let data = view.project_x(mode)?;
                let (d_min, d_max, d_unit) = self.depth_scale();
                let out_scale = Scale::new(scale.y_min, scale.y_max, d_min, d_max)
                    .with_units(scale.y_unit.clone(), d_unit);
                (data, self.y_count(), depth, out_scale)
            }
        };

        let mut result = self.derive(width, height, vec![Arc::new(data)], Vec::new());
        result.set_scale(out_scale);
        result.refresh_value_range(None)?;
        Ok(result)
    }

    fn depth_scale(&self) -> (f64, f64, String) {
        match self.dimensions().axes() {
            [axis] => (axis.min(), axis.max(), axis.unit().to_string()),
            _ => (0.0, self.frame_count().saturating_sub(1) as f64, String::new()),
        }
    }
}
