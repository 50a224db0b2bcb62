//! Per-frame 2D transpose

use crate::config::EngineConfig;
use crate::stack::FrameStack;
use crate::types::Element;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::instrument;

/// Transpose one `x_count` by `y_count` frame into `dst` using square
/// `block` by `block` tiles, so both the read and the write side of a tile
/// stay cache resident.
pub fn transpose_frame<T: Copy>(src: &[T], dst: &mut [T], x_count: usize, y_count: usize, block: usize) {
    debug_assert_eq!(src.len(), x_count * y_count);
    debug_assert_eq!(dst.len(), src.len());
    let block = block.max(1);

    for by in (0..y_count).step_by(block) {
        let y_end = (by + block).min(y_count);
        for bx in (0..x_count).step_by(block) {
            let x_end = (bx + block).min(x_count);
            for iy in by..y_end {
                let row = &src[iy * x_count..(iy + 1) * x_count];
                for ix in bx..x_end {
                    dst[ix * y_count + iy] = row[ix];
                }
            }
        }
    }
}

impl<T: Element> FrameStack<T> {
    /// Swap X and Y of every frame, scale and units included
    pub fn transpose(&self) -> FrameStack<T> {
        self.transpose_with(&EngineConfig::default())
    }

    /// [`FrameStack::transpose`] with an explicit block size
    #[instrument(skip_all, fields(frames = self.frame_count(), block = config.transpose_block))]
    pub fn transpose_with(&self, config: &EngineConfig) -> FrameStack<T> {
        let (x_count, y_count) = (self.x_count(), self.y_count());
        let block = config.transpose_block;

        let frames: Vec<Arc<Vec<T>>> = self
            .shared_frames()
            .par_iter()
            .map(|src| {
                let mut dst = vec![T::default(); src.len()];
                transpose_frame(src, &mut dst, x_count, y_count, block);
                Arc::new(dst)
            })
            .collect();

        // a transpose moves values without changing them
        let ranges = (0..frames.len()).map(|i| self.cached_range(i)).collect();

        let mut result = self.derive(y_count, x_count, frames, ranges);
        result.set_scale(self.scale().transposed());
        result.set_dimensions(self.dimensions().clone());
        result
    }
}
