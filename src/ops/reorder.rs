//! Frame reordering and the selections built on it

use crate::dimensions::compute_strides;
use crate::error::{FrameError, Result};
use crate::stack::FrameStack;
use crate::types::Element;
use std::sync::Arc;
use tracing::{debug, instrument};

impl<T: Element> FrameStack<T> {
    /// New stack whose frame `i` is source frame `order[i]`.
    ///
    /// `order` may repeat or omit indices. The dimension map is dropped.
    /// Without `deep_copy` the result shares frame buffers with `self`.
    #[instrument(skip(self, order), fields(len = order.len()))]
    pub fn reorder(&self, order: &[usize], deep_copy: bool) -> Result<FrameStack<T>> {
        let Some(&max) = order.iter().max() else {
            return Err(FrameError::InvalidArgument(
                "frame order list is empty".to_string(),
            ));
        };
        if max >= self.frame_count() {
            return Err(FrameError::OutOfBounds(format!(
                "frame order refers to frame {} but the stack holds {} frames",
                max,
                self.frame_count()
            )));
        }

        let source = self.shared_frames();
        let frames = order
            .iter()
            .map(|&i| {
                if deep_copy {
                    Arc::new(source[i].as_ref().clone())
                } else {
                    Arc::clone(&source[i])
                }
            })
            .collect();
        let ranges = order.iter().map(|&i| self.cached_range(i)).collect();

        Ok(self.derive(self.x_count(), self.y_count(), frames, ranges))
    }

    /// Permute the axis order, keeping every axis.
    ///
    /// `names` must list exactly the existing axis names. Each frame keeps
    /// its coordinates and moves to the index those coordinates have under
    /// the new strides.
    #[instrument(skip(self))]
    pub fn reorder_axes(&self, names: &[&str], deep_copy: bool) -> Result<FrameStack<T>> {
        let dims = self.dimensions();
        if dims.is_empty() {
            return Err(FrameError::InvalidOperation(
                "cannot reorder axes of a stack without dimensions".to_string(),
            ));
        }
        let old_positions = dims.validate_permutation(names)?;

        let axes: Vec<_> = old_positions.iter().map(|&p| dims.axes()[p].clone()).collect();
        let counts: Vec<usize> = axes.iter().map(|a| a.count()).collect();
        let strides = compute_strides(&counts);

        let mut order = vec![0; self.frame_count()];
        for frame in 0..self.frame_count() {
            let coords = dims.axis_indices(frame)?;
            let new_index: usize = old_positions
                .iter()
                .zip(&strides)
                .map(|(&old, &stride)| coords[old] * stride)
                .sum();
            order[new_index] = frame;
        }
        debug!(from = %dims, "axis permutation resolved");

        let mut result = self.reorder(&order, deep_copy)?;
        result.define_dimensions(axes)?;
        Ok(result)
    }

    /// Frames where `axis` equals `index`, with that axis removed from the map
    pub fn snap_to(&self, axis: &str, index: usize, deep_copy: bool) -> Result<FrameStack<T>> {
        let dims = self.dimensions();
        let indices = dims.indices_for_slice(axis, index)?;
        if indices.is_empty() {
            return Err(FrameError::InvalidOperation(format!(
                "slice {} of axis '{}' selects no frames ({})",
                index, axis, dims
            )));
        }
        let remaining = dims.axes_without(axis)?;

        let mut result = self.reorder(&indices, deep_copy)?;
        result.define_dimensions(remaining)?;
        Ok(result)
    }

    /// Single-frame stack holding frame `frame_index`
    pub fn slice_at(&self, frame_index: usize, deep_copy: bool) -> Result<FrameStack<T>> {
        self.reorder(&[frame_index], deep_copy)
    }

    /// Single-frame stack at the given axis coordinates.
    ///
    /// Axes not named keep the coordinate of the active frame.
    pub fn slice_at_coords(&self, coords: &[(&str, usize)], deep_copy: bool) -> Result<FrameStack<T>> {
        let dims = self.dimensions();
        if dims.is_empty() {
            return Err(FrameError::InvalidOperation(
                "coordinate slicing needs a dimension map".to_string(),
            ));
        }

        let mut current = dims.axis_indices(self.active_index())?;
        for &(name, index) in coords {
            current[dims.axis_order(name)?] = index;
        }
        let frame = dims.frame_index_from(&current)?;
        self.slice_at(frame, deep_copy)
    }

    /// Sweep `axis` over its full range with every other axis held at
    /// `base_indices` (one coordinate per axis; the entry for `axis` is
    /// ignored). The result is one-dimensional along `axis`.
    pub fn extract_along(&self, axis: &str, base_indices: &[usize], deep_copy: bool) -> Result<FrameStack<T>> {
        let dims = self.dimensions();
        let position = dims.axis_order(axis)?;
        let target = dims.axes()[position].clone();
        if base_indices.len() != dims.axis_count() {
            return Err(FrameError::shape(
                format!("{} base coordinates ({})", dims.axis_count(), dims),
                format!("{} base coordinates", base_indices.len()),
            ));
        }

        let mut coords = base_indices.to_vec();
        let mut order = Vec::with_capacity(target.count());
        for i in 0..target.count() {
            coords[position] = i;
            order.push(dims.frame_index_from(&coords)?);
        }

        let mut result = self.reorder(&order, deep_copy)?;
        result.define_dimensions(vec![target])?;
        Ok(result)
    }
}
