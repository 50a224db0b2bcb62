//! Element-wise conversion into a new stack

use crate::error::Result;
use crate::stack::FrameStack;
use crate::types::{Element, FrameRange, RangeAccumulator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Parallel layout of a [`FrameStack::map`] pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapStrategy {
    /// Frame-parallel when there are at least as many frames as workers,
    /// row-parallel otherwise
    #[default]
    Auto,
    /// One task per frame
    FrameParallel,
    /// Frames in sequence, rows of each frame in parallel
    RowParallel,
}

impl MapStrategy {
    /// Concrete strategy for `frame_count` frames
    pub fn resolve(self, frame_count: usize) -> MapStrategy {
        match self {
            MapStrategy::Auto if frame_count >= rayon::current_num_threads() => {
                MapStrategy::FrameParallel
            }
            MapStrategy::Auto => MapStrategy::RowParallel,
            other => other,
        }
    }
}

fn merged<U: Element>(mut left: U::Accumulator, right: U::Accumulator) -> U::Accumulator {
    left.merge(right);
    left
}

impl<T: Element> FrameStack<T> {
    /// Convert every element with `converter(value, ix, iy, frame_index)`.
    ///
    /// Value ranges of the result are collected in the same pass. Scale,
    /// tags and dimensions carry over.
    #[instrument(skip(self, converter), fields(frames = self.frame_count()))]
    pub fn map<U, F>(&self, converter: F, strategy: MapStrategy) -> FrameStack<U>
    where
        U: Element,
        F: Fn(T, usize, usize, usize) -> U + Sync,
    {
        let x_count = self.x_count();
        let len = self.frame_len();
        let strategy = strategy.resolve(self.frame_count());
        debug!(?strategy, "map strategy");

        let convert_row = |src: &[T], dst: &mut [U], iy: usize, frame: usize| {
            let mut acc = U::Accumulator::default();
            for (ix, (out, &value)) in dst.iter_mut().zip(src).enumerate() {
                *out = converter(value, ix, iy, frame);
                acc.push(*out);
            }
            acc
        };

        let converted: Vec<(Arc<Vec<U>>, Option<FrameRange>)> = match strategy {
            MapStrategy::RowParallel => self
                .shared_frames()
                .iter()
                .enumerate()
                .map(|(frame, src)| {
                    let mut dst = vec![U::default(); len];
                    let acc = dst
                        .par_chunks_mut(x_count)
                        .zip(src.par_chunks(x_count))
                        .enumerate()
                        .map(|(iy, (out, row))| convert_row(row, out, iy, frame))
                        .reduce(U::Accumulator::default, merged::<U>);
                    (Arc::new(dst), acc.finish())
                })
                .collect(),
            _ => self
                .shared_frames()
                .par_iter()
                .enumerate()
                .map(|(frame, src)| {
                    let mut dst = vec![U::default(); len];
                    let acc = dst
                        .chunks_mut(x_count)
                        .zip(src.chunks(x_count))
                        .enumerate()
                        .map(|(iy, (out, row))| convert_row(row, out, iy, frame))
                        .fold(U::Accumulator::default(), merged::<U>);
                    (Arc::new(dst), acc.finish())
                })
                .collect(),
        };

        let (frames, ranges) = converted.into_iter().unzip();
        let mut result = self.derive(x_count, self.y_count(), frames, ranges);
        result.set_dimensions(self.dimensions().clone());
        result
    }

    /// Convert one frame (the active one for `None`) with
    /// `converter(value, ix, iy, x, y)`, where `x`/`y` are the physical
    /// coordinates of the pixel. The result is a dimension-less single frame.
    #[instrument(skip(self, converter))]
    pub fn map_at<U, F>(&self, converter: F, index: Option<usize>) -> Result<FrameStack<U>>
    where
        U: Element,
        F: Fn(T, usize, usize, f64, f64) -> U + Sync,
    {
        let index = self.resolve_index(index)?;
        let src = self.frame(index)?;
        let x_count = self.x_count();
        let scale = self.scale();
        let (x_step, y_step) = (self.x_step(), self.y_step());

        let mut dst = vec![U::default(); self.frame_len()];
        let acc = dst
            .par_chunks_mut(x_count)
            .zip(src.par_chunks(x_count))
            .enumerate()
            .map(|(iy, (out, row))| {
                let mut acc = U::Accumulator::default();
                let y = scale.y_min + iy as f64 * y_step;
                for (ix, (o, &value)) in out.iter_mut().zip(row).enumerate() {
                    *o = converter(value, ix, iy, scale.x_min + ix as f64 * x_step, y);
                    acc.push(*o);
                }
                acc
            })
            .reduce(U::Accumulator::default, merged::<U>);

        Ok(self.derive(x_count, self.y_count(), vec![Arc::new(dst)], vec![acc.finish()]))
    }
}
