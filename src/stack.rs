//! Frame stack - the frame-indexed typed container every operator works on

use crate::axis::Axis;
use crate::config::EngineConfig;
use crate::dimensions::Dimensions;
use crate::error::{FrameError, Result};
use crate::metadata::{Metadata, Scale};
use crate::minmax::DEFAULT_MIN_PARTITION_LEN;
use crate::types::{DataType, Element, FrameRange};
use crate::utils::format_bytes;
use ndarray::{Array3, ArrayView2};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// An ordered list of `x_count * y_count` frames plus the physical scale,
/// tags and dimension map describing them.
///
/// Frame buffers are reference counted. Shallow operator results share
/// buffers with their source; writes through [`FrameStack::frame_mut`] copy
/// a shared buffer first, so an alias never changes underneath its owner.
pub struct FrameStack<T: Element> {
    x_count: usize,
    y_count: usize,
    frames: Vec<Arc<Vec<T>>>,
    scale: Scale,
    active_index: usize,
    metadata: Metadata,
    dimensions: Dimensions,
    /// Per-frame value range cache, `None` until computed
    ranges: RwLock<Vec<Option<FrameRange>>>,
}

impl<T: Element> FrameStack<T> {
    /// Zero-filled stack
    pub fn new(x_count: usize, y_count: usize, frame_count: usize) -> Result<Self> {
        check_frame_shape(x_count, y_count)?;
        let frames = (0..frame_count)
            .map(|_| Arc::new(vec![T::default(); x_count * y_count]))
            .collect();
        Ok(Self::from_shared(x_count, y_count, frames, Vec::new()))
    }

    /// Stack over existing frame buffers
    pub fn from_frames(x_count: usize, y_count: usize, frames: Vec<Vec<T>>) -> Result<Self> {
        check_frame_shape(x_count, y_count)?;
        check_frame_lengths(x_count, y_count, &frames)?;
        let frames = frames.into_iter().map(Arc::new).collect();
        Ok(Self::from_shared(x_count, y_count, frames, Vec::new()))
    }

    /// Stack over existing frame buffers with precomputed per-frame ranges.
    ///
    /// Empty `mins`/`maxs` mark the ranges as unavailable; they are then
    /// computed on first request.
    pub fn from_frames_with_ranges(
        x_count: usize,
        y_count: usize,
        frames: Vec<Vec<T>>,
        mins: Vec<Vec<f64>>,
        maxs: Vec<Vec<f64>>,
    ) -> Result<Self> {
        check_frame_shape(x_count, y_count)?;
        check_frame_lengths(x_count, y_count, &frames)?;

        let ranges = if mins.is_empty() && maxs.is_empty() {
            Vec::new()
        } else {
            if mins.len() != frames.len() || maxs.len() != frames.len() {
                return Err(FrameError::shape(
                    format!("{} min and max lists", frames.len()),
                    format!("{} min and {} max lists", mins.len(), maxs.len()),
                ));
            }
            let mut ranges = Vec::with_capacity(frames.len());
            for (i, (min, max)) in mins.into_iter().zip(maxs).enumerate() {
                if min.len() != T::RANGE_CHANNELS || max.len() != T::RANGE_CHANNELS {
                    return Err(FrameError::shape(
                        format!("{} range channels for {}", T::RANGE_CHANNELS, T::DATA_TYPE),
                        format!("{} / {} at frame {}", min.len(), max.len(), i),
                    ));
                }
                ranges.push(Some(FrameRange::new(min, max)));
            }
            ranges
        };

        let frames = frames.into_iter().map(Arc::new).collect();
        Ok(Self::from_shared(x_count, y_count, frames, ranges))
    }

    /// Stack from an ndarray of shape `(frames, y_count, x_count)`
    pub fn from_array3(array: Array3<T>) -> Result<Self> {
        let (frame_count, y_count, x_count) = array.dim();
        check_frame_shape(x_count, y_count)?;
        let frames = (0..frame_count)
            .map(|f| {
                let frame = array.index_axis(ndarray::Axis(0), f);
                Arc::new(frame.iter().copied().collect::<Vec<T>>())
            })
            .collect();
        Ok(Self::from_shared(x_count, y_count, frames, Vec::new()))
    }

    /// Copy into an ndarray of shape `(frames, y_count, x_count)`
    pub fn to_array3(&self) -> Result<Array3<T>> {
        let mut flat = Vec::with_capacity(self.frames.len() * self.frame_len());
        for frame in &self.frames {
            flat.extend_from_slice(frame);
        }
        Ok(Array3::from_shape_vec(
            (self.frames.len(), self.y_count, self.x_count),
            flat,
        )?)
    }

    /// `ranges` must hold one entry per frame; any other length leaves
    /// every range uncomputed.
    pub(crate) fn from_shared(
        x_count: usize,
        y_count: usize,
        frames: Vec<Arc<Vec<T>>>,
        ranges: Vec<Option<FrameRange>>,
    ) -> Self {
        let ranges = if ranges.len() == frames.len() {
            ranges
        } else {
            vec![None; frames.len()]
        };
        Self {
            x_count,
            y_count,
            scale: Scale::pixels(x_count, y_count),
            active_index: 0,
            metadata: Metadata::new(),
            dimensions: Dimensions::empty(),
            ranges: RwLock::new(ranges),
            frames,
        }
    }

    /// New dimension-less stack carrying this stack's scale, units and tags
    pub(crate) fn derive<U: Element>(
        &self,
        x_count: usize,
        y_count: usize,
        frames: Vec<Arc<Vec<U>>>,
        ranges: Vec<Option<FrameRange>>,
    ) -> FrameStack<U> {
        let mut derived = FrameStack::from_shared(x_count, y_count, frames, ranges);
        derived.scale = self.scale.clone();
        derived.metadata = self.metadata.clone();
        derived.active_index = self.active_index.min(derived.frames.len().saturating_sub(1));
        derived
    }

    pub fn x_count(&self) -> usize {
        self.x_count
    }

    pub fn y_count(&self) -> usize {
        self.y_count
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Elements per frame
    pub fn frame_len(&self) -> usize {
        self.x_count * self.y_count
    }

    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    /// Frame buffer by index
    pub fn frame(&self, index: usize) -> Result<&[T]> {
        self.shared_frame(index).map(|f| f.as_slice())
    }

    /// Frame buffer of the active index
    pub fn active_frame(&self) -> Result<&[T]> {
        self.frame(self.active_index)
    }

    /// Resolve an optional frame index, `None` meaning the active frame
    pub fn resolve_index(&self, index: Option<usize>) -> Result<usize> {
        let index = index.unwrap_or(self.active_index);
        self.check_index(index)?;
        Ok(index)
    }

    /// Reference-counted frame buffer by index
    pub fn shared_frame(&self, index: usize) -> Result<&Arc<Vec<T>>> {
        self.check_index(index)?;
        Ok(&self.frames[index])
    }

    pub(crate) fn shared_frames(&self) -> &[Arc<Vec<T>>] {
        &self.frames
    }

    pub(crate) fn cached_range(&self, index: usize) -> Option<FrameRange> {
        self.ranges.read().get(index).cloned().flatten()
    }

    pub fn frames(&self) -> impl Iterator<Item = &[T]> {
        self.frames.iter().map(|f| f.as_slice())
    }

    /// Replace a frame buffer
    pub fn set_array(&mut self, index: usize, data: Vec<T>) -> Result<()> {
        self.check_index(index)?;
        if data.len() != self.frame_len() {
            return Err(FrameError::shape(
                format!("{} elements ({} x {})", self.frame_len(), self.x_count, self.y_count),
                format!("{} elements", data.len()),
            ));
        }
        self.frames[index] = Arc::new(data);
        self.ranges.get_mut()[index] = None;
        Ok(())
    }

    /// Mutable frame buffer; copies the buffer first when it is shared
    pub fn frame_mut(&mut self, index: usize) -> Result<&mut [T]> {
        self.check_index(index)?;
        self.ranges.get_mut()[index] = None;
        Ok(Arc::make_mut(&mut self.frames[index]).as_mut_slice())
    }

    /// Element-type-agnostic byte view of a frame
    pub fn raw_bytes(&self, index: usize) -> Result<&[u8]> {
        Ok(bytemuck::cast_slice(self.frame(index)?))
    }

    /// Cached value range of a frame, computed on first request
    pub fn value_range(&self, index: usize) -> Result<FrameRange> {
        self.check_index(index)?;
        if let Some(range) = &self.ranges.read()[index] {
            return Ok(range.clone());
        }
        let range = T::value_range(&self.frames[index], DEFAULT_MIN_PARTITION_LEN);
        self.ranges.write()[index] = Some(range.clone());
        Ok(range)
    }

    /// Per-channel minima and maxima of a frame
    pub fn min_max_arrays(&self, index: usize) -> Result<(Vec<f64>, Vec<f64>)> {
        let range = self.value_range(index)?;
        Ok((range.min, range.max))
    }

    /// Whether the range of a frame is currently cached
    pub fn has_cached_range(&self, index: usize) -> bool {
        self.ranges
            .read()
            .get(index)
            .map(|r| r.is_some())
            .unwrap_or(false)
    }

    /// Recompute the cached range of one frame, or of all frames for `None`
    pub fn refresh_value_range(&self, index: Option<usize>) -> Result<()> {
        self.refresh_value_range_with(index, &EngineConfig::default())
    }

    /// [`FrameStack::refresh_value_range`] with explicit kernel settings
    pub fn refresh_value_range_with(&self, index: Option<usize>, config: &EngineConfig) -> Result<()> {
        let min_part = config.min_partition_len;
        match index {
            Some(index) => {
                self.check_index(index)?;
                let range = T::value_range(&self.frames[index], min_part);
                self.ranges.write()[index] = Some(range);
            }
            None => {
                let computed: Vec<Option<FrameRange>> = self
                    .frames
                    .par_iter()
                    .map(|f| Some(T::value_range(f, min_part)))
                    .collect();
                *self.ranges.write() = computed;
            }
        }
        Ok(())
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Replace the scale, units included
    pub fn set_scale(&mut self, scale: Scale) {
        self.scale = scale;
    }

    pub fn set_xy_scale(&mut self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
        self.scale.x_min = x_min;
        self.scale.x_max = x_max;
        self.scale.y_min = y_min;
        self.scale.y_max = y_max;
    }

    pub fn x_unit(&self) -> &str {
        &self.scale.x_unit
    }

    pub fn y_unit(&self) -> &str {
        &self.scale.y_unit
    }

    pub fn set_units(&mut self, x_unit: impl Into<String>, y_unit: impl Into<String>) {
        self.scale.x_unit = x_unit.into();
        self.scale.y_unit = y_unit.into();
    }

    /// Physical distance between neighbouring columns
    pub fn x_step(&self) -> f64 {
        self.scale.x_step(self.x_count)
    }

    /// Physical distance between neighbouring rows
    pub fn y_step(&self) -> f64 {
        self.scale.y_step(self.y_count)
    }

    /// Physical coordinate of a pixel
    pub fn physical_xy(&self, ix: usize, iy: usize) -> (f64, f64) {
        (
            self.scale.x_min + ix as f64 * self.x_step(),
            self.scale.y_min + iy as f64 * self.y_step(),
        )
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn set_active_index(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.active_index = index;
        Ok(())
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    /// Attach (or with an empty list, clear) the dimension map
    pub fn define_dimensions(&mut self, axes: Vec<Axis>) -> Result<()> {
        self.dimensions = Dimensions::new(axes, self.frames.len())?;
        Ok(())
    }

    /// Install a dimension map already known to fit this stack
    pub(crate) fn set_dimensions(&mut self, dimensions: Dimensions) {
        debug_assert_eq!(
            dimensions.frame_count().unwrap_or(self.frames.len()),
            self.frames.len()
        );
        self.dimensions = dimensions;
    }

    /// 2D view of a frame with shape `(y_count, x_count)`
    pub fn frame_view(&self, index: usize) -> Result<ArrayView2<'_, T>> {
        let frame = self.frame(index)?;
        Ok(ArrayView2::from_shape((self.y_count, self.x_count), frame)?)
    }

    /// Get a summary string of the stack
    pub fn summary(&self) -> String {
        format!(
            "{} x {} x {} frames ({}), dimensions {}, {}",
            self.x_count,
            self.y_count,
            self.frames.len(),
            T::DATA_TYPE,
            self.dimensions,
            format_bytes(self.frames.len() * self.frame_len() * T::DATA_TYPE.size_in_bytes())
        )
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.frames.len() {
            return Err(FrameError::OutOfBounds(format!(
                "frame index {} for a stack of {} frames",
                index,
                self.frames.len()
            )));
        }
        Ok(())
    }
}

impl<T: Element> Clone for FrameStack<T> {
    /// Shallow: frame buffers are shared, everything else is copied
    fn clone(&self) -> Self {
        Self {
            x_count: self.x_count,
            y_count: self.y_count,
            frames: self.frames.clone(),
            scale: self.scale.clone(),
            active_index: self.active_index,
            metadata: self.metadata.clone(),
            dimensions: self.dimensions.clone(),
            ranges: RwLock::new(self.ranges.read().clone()),
        }
    }
}

impl<T: Element> fmt::Debug for FrameStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameStack")
            .field("x_count", &self.x_count)
            .field("y_count", &self.y_count)
            .field("frame_count", &self.frames.len())
            .field("data_type", &T::DATA_TYPE)
            .field("scale", &self.scale)
            .field("active_index", &self.active_index)
            .field("dimensions", &self.dimensions.to_string())
            .finish()
    }
}

pub(crate) fn check_frame_shape(x_count: usize, y_count: usize) -> Result<()> {
    if x_count == 0 || y_count == 0 {
        return Err(FrameError::InvalidArgument(format!(
            "frame size must be positive, got {} x {}",
            x_count, y_count
        )));
    }
    Ok(())
}

fn check_frame_lengths<T>(x_count: usize, y_count: usize, frames: &[Vec<T>]) -> Result<()> {
    let expected = x_count * y_count;
    for (i, frame) in frames.iter().enumerate() {
        if frame.len() != expected {
            return Err(FrameError::shape(
                format!("{} elements ({} x {})", expected, x_count, y_count),
                format!("{} elements at frame {}", frame.len(), i),
            ));
        }
    }
    Ok(())
}
