//! Per-pixel reductions across frames

use crate::dimensions::Dimensions;
use crate::error::{FrameError, Result};
use crate::stack::FrameStack;
use crate::types::Element;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Reduce the pixels of `frames` into one output frame.
///
/// Each task owns one gather buffer of `frames.len()` values and reuses it
/// for every pixel of its rows.
fn reduce_frames<T, U, F>(frames: &[&[T]], x_count: usize, len: usize, reducer: &F, parallel: bool) -> Vec<U>
where
    T: Element,
    U: Element,
    F: Fn(&[T]) -> U + Sync,
{
    let gather_row = |buffer: &mut Vec<T>, iy: usize, out: &mut [U]| {
        let offset = iy * x_count;
        for (ix, value) in out.iter_mut().enumerate() {
            for (slot, frame) in buffer.iter_mut().zip(frames) {
                *slot = frame[offset + ix];
            }
            *value = reducer(buffer.as_slice());
        }
    };

    let mut dst = vec![U::default(); len];
    if parallel {
        dst.par_chunks_mut(x_count).enumerate().for_each_init(
            || vec![T::default(); frames.len()],
            |buffer, (iy, out)| gather_row(buffer, iy, out),
        );
    } else {
        let mut buffer = vec![T::default(); frames.len()];
        for (iy, out) in dst.chunks_mut(x_count).enumerate() {
            gather_row(&mut buffer, iy, out);
        }
    }
    dst
}

impl<T: Element> FrameStack<T> {
    /// Collapse all frames into one: `reducer` receives, per pixel, the
    /// values of every frame in frame order.
    #[instrument(skip(self, reducer), fields(frames = self.frame_count()))]
    pub fn reduce<U, F>(&self, reducer: F, parallel: bool) -> Result<FrameStack<U>>
    where
        U: Element,
        F: Fn(&[T]) -> U + Sync,
    {
        if self.frame_count() == 0 {
            return Err(FrameError::InvalidOperation(
                "cannot reduce a stack without frames".to_string(),
            ));
        }

        let frames: Vec<&[T]> = self.frames().collect();
        let data = reduce_frames(&frames, self.x_count(), self.frame_len(), &reducer, parallel);

        let result = self.derive(self.x_count(), self.y_count(), vec![Arc::new(data)], Vec::new());
        result.refresh_value_range(None)?;
        Ok(result)
    }

    /// Collapse the named axis, keeping every other one.
    ///
    /// One output frame is produced per coordinate combination of the
    /// remaining axes; `reducer` receives the values along `axis` in axis
    /// order. Output frames follow the remaining axes' own dimension map.
    #[instrument(skip(self, reducer))]
    pub fn reduce_axis<U, F>(&self, axis: &str, reducer: F, parallel: bool) -> Result<FrameStack<U>>
    where
        U: Element,
        F: Fn(&[T]) -> U + Sync,
    {
        let dims = self.dimensions();
        let position = dims.axis_order(axis)?;
        let depth = dims.axes()[position].count();
        let others = dims.axes_without(axis)?;
        let group_count = self.frame_count() / depth;
        let remaining = Dimensions::new(others.clone(), group_count)?;
        debug!(groups = group_count, depth, "reducing along axis");

        let all: Vec<&[T]> = self.frames().collect();
        let mut frames = Vec::with_capacity(group_count);
        let mut members: Vec<&[T]> = Vec::with_capacity(depth);
        for group in 0..group_count {
            let mut coords = if remaining.is_empty() {
                Vec::new()
            } else {
                remaining.axis_indices(group)?
            };
            coords.insert(position, 0);

            members.clear();
            for i in 0..depth {
                coords[position] = i;
                members.push(all[dims.frame_index_from(&coords)?]);
            }
            let data = reduce_frames(&members, self.x_count(), self.frame_len(), &reducer, parallel);
            frames.push(Arc::new(data));
        }

        let mut result = self.derive(self.x_count(), self.y_count(), frames, Vec::new());
        result.define_dimensions(others)?;
        result.refresh_value_range(None)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;

    /// Channel[2] x Z[3]; frame f holds `f * 10 + pixel`
    fn create_test_stack() -> FrameStack<u16> {
        let frames = (0..6u16)
            .map(|f| (0..4u16).map(|p| f * 10 + p).collect())
            .collect();
        let mut stack = FrameStack::from_frames(2, 2, frames).unwrap();
        stack
            .define_dimensions(vec![Axis::index_based("Channel", 2), Axis::index_based("Z", 3)])
            .unwrap();
        stack
    }

    fn max_of(values: &[u16]) -> u16 {
        values.iter().copied().max().unwrap_or(0)
    }

    #[test]
    fn test_reduce_whole_stack() {
        let stack = create_test_stack();
        for parallel in [true, false] {
            let result: FrameStack<f64> = stack
                .reduce(
                    |v: &[u16]| v.iter().map(|&x| x as f64).sum::<f64>() / v.len() as f64,
                    parallel,
                )
                .unwrap();
            assert_eq!(result.frame_count(), 1);
            assert!(result.dimensions().is_empty());
            assert_eq!(result.frame(0).unwrap(), &[25.0, 26.0, 27.0, 28.0]);
            assert!(result.has_cached_range(0));
            assert_eq!(result.min_max_arrays(0).unwrap(), (vec![25.0], vec![28.0]));
        }
    }

    #[test]
    fn test_reduce_sees_frame_order() {
        let stack = create_test_stack();
        let result: FrameStack<u16> = stack.reduce(|v: &[u16]| v[5] - v[0], true).unwrap();
        assert_eq!(result.frame(0).unwrap(), &[50, 50, 50, 50]);
    }

    #[test]
    fn test_reduce_axis() {
        let stack = create_test_stack();
        let result = stack.reduce_axis("Z", max_of, true).unwrap();
        assert_eq!(result.frame_count(), 2);
        assert_eq!(result.dimensions().to_string(), "Channel[2]");
        // channel c collects frames c, c + 2, c + 4
        assert_eq!(result.frame(0).unwrap(), &[40, 41, 42, 43]);
        assert_eq!(result.frame(1).unwrap(), &[50, 51, 52, 53]);

        let by_channel = stack.reduce_axis("Channel", |v: &[u16]| v[1] - v[0], false).unwrap();
        assert_eq!(by_channel.frame_count(), 3);
        assert_eq!(by_channel.dimensions().to_string(), "Z[3]");
        assert!(by_channel.frames().all(|f| f == [10, 10, 10, 10]));
    }

    #[test]
    fn test_reduce_only_axis() {
        let frames = (0..3u16).map(|f| vec![f; 4]).collect();
        let mut stack = FrameStack::from_frames(2, 2, frames).unwrap();
        stack.define_dimensions(vec![Axis::index_based("Time", 3)]).unwrap();
        let result = stack.reduce_axis("Time", max_of, true).unwrap();
        assert_eq!(result.frame_count(), 1);
        assert!(result.dimensions().is_empty());
        assert_eq!(result.frame(0).unwrap(), &[2, 2, 2, 2]);
    }

    #[test]
    fn test_reduce_axis_errors() {
        let stack = create_test_stack();
        assert!(matches!(
            stack.reduce_axis("Time", max_of, true),
            Err(FrameError::AxisNotFound(_))
        ));
        let flat = FrameStack::<u16>::new(2, 2, 3).unwrap();
        assert!(flat.reduce_axis("Z", max_of, true).is_err());
    }
}
