//! Rectangular crops in pixel or physical coordinates

use crate::error::{FrameError, Result};
use crate::stack::FrameStack;
use crate::types::Element;
use rayon::prelude::*;
use std::sync::Arc;

impl<T: Element> FrameStack<T> {
    /// Cut the `width` by `height` rectangle at pixel `(x, y)` out of every frame.
    ///
    /// The new bounds are `min + offset * step` and
    /// `new_min + (extent - 1) * step`, so repeated crops do not drift.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> Result<FrameStack<T>> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidArgument(format!(
                "crop size must be positive, got {} x {}",
                width, height
            )));
        }
        let fits_x = x < self.x_count() && width <= self.x_count() - x;
        let fits_y = y < self.y_count() && height <= self.y_count() - y;
        if !fits_x || !fits_y {
            return Err(FrameError::OutOfBounds(format!(
                "crop {} x {} at ({}, {}) exceeds the {} x {} frame",
                width,
                height,
                x,
                y,
                self.x_count(),
                self.y_count()
            )));
        }

        let x_count = self.x_count();
        let frames: Vec<Arc<Vec<T>>> = self
            .shared_frames()
            .par_iter()
            .map(|src| {
                let mut dst = Vec::with_capacity(width * height);
                for row in src.chunks_exact(x_count).skip(y).take(height) {
                    dst.extend_from_slice(&row[x..x + width]);
                }
                Arc::new(dst)
            })
            .collect();

        let (x_step, y_step) = (self.x_step(), self.y_step());
        let mut scale = self.scale().clone();
        scale.x_min += x as f64 * x_step;
        scale.x_max = scale.x_min + (width - 1) as f64 * x_step;
        scale.y_min += y as f64 * y_step;
        scale.y_max = scale.y_min + (height - 1) as f64 * y_step;

        let mut result = self.derive(width, height, frames, Vec::new());
        result.set_scale(scale);
        result.set_dimensions(self.dimensions().clone());
        Ok(result)
    }

    /// Crop to a physical rectangle.
    ///
    /// Bounds are mapped to the nearest pixel and clamped to the frame; their
    /// order does not matter.
    pub fn crop_by_coordinates(&self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<FrameStack<T>> {
        let scale = self.scale();
        let to_pixel = |value: f64, origin: f64, step: f64, count: usize| -> usize {
            if step == 0.0 {
                return 0;
            }
            let pixel = ((value - origin) / step).round();
            pixel.clamp(0.0, (count - 1) as f64) as usize
        };

        let (x_step, y_step) = (self.x_step(), self.y_step());
        let x0 = to_pixel(x_min, scale.x_min, x_step, self.x_count());
        let x1 = to_pixel(x_max, scale.x_min, x_step, self.x_count());
        let y0 = to_pixel(y_min, scale.y_min, y_step, self.y_count());
        let y1 = to_pixel(y_max, scale.y_min, y_step, self.y_count());

        let (left, right) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        self.crop(left, top, right - left + 1, bottom - top + 1)
    }

    /// Crop a centred `width` by `height` rectangle
    pub fn crop_center(&self, width: usize, height: usize) -> Result<FrameStack<T>> {
        if width > self.x_count() || height > self.y_count() {
            return Err(FrameError::OutOfBounds(format!(
                "centre crop {} x {} exceeds the {} x {} frame",
                width,
                height,
                self.x_count(),
                self.y_count()
            )));
        }
        self.crop(
            (self.x_count() - width) / 2,
            (self.y_count() - height) / 2,
            width,
            height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;

    fn create_test_stack() -> FrameStack<u16> {
        let frames = (0..2u16)
            .map(|f| (0..101 * 101).map(|v| (v % 1000) as u16 + f).collect())
            .collect();
        let mut stack = FrameStack::from_frames(101, 101, frames).unwrap();
        stack.set_xy_scale(-10.0, 10.0, 0.0, 100.0);
        stack.define_dimensions(vec![Axis::index_based("Channel", 2)]).unwrap();
        stack
    }

    #[test]
    fn test_crop_bounds_are_exact() {
        let stack = create_test_stack();
        let result = stack.crop(25, 0, 50, 101).unwrap();
        assert_eq!(result.scale().x_min, -5.0);
        assert_eq!(result.scale().x_max, -5.0 + 49.0 * stack.x_step());
        assert_eq!(result.scale().y_min, 0.0);
        assert_eq!(result.scale().y_max, 100.0);
        assert_eq!((result.x_count(), result.y_count()), (50, 101));
        assert_eq!(result.dimensions().axis_count(), 1);
    }

    #[test]
    fn test_crop_content() {
        let stack = create_test_stack();
        let result = stack.crop(3, 4, 5, 2).unwrap();
        let src = stack.frame(1).unwrap();
        let dst = result.frame(1).unwrap();
        assert_eq!(dst.len(), 10);
        assert_eq!(dst[0], src[4 * 101 + 3]);
        assert_eq!(dst[9], src[5 * 101 + 7]);
    }

    #[test]
    fn test_crop_rejects_out_of_frame() {
        let stack = create_test_stack();
        assert!(matches!(
            stack.crop(60, 0, 50, 10),
            Err(FrameError::OutOfBounds(_))
        ));
        assert!(matches!(
            stack.crop(0, 0, 0, 10),
            Err(FrameError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_crop_rejects_huge_offsets() {
        let stack = FrameStack::from_frames(2, 2, vec![vec![1u8, 2, 3, 4]]).unwrap();
        assert!(matches!(
            stack.crop(usize::MAX, 0, 2, 1),
            Err(FrameError::OutOfBounds(_))
        ));
        assert!(matches!(
            stack.crop(0, usize::MAX, 1, 1),
            Err(FrameError::OutOfBounds(_))
        ));
        assert!(matches!(
            stack.crop(1, 0, usize::MAX, 1),
            Err(FrameError::OutOfBounds(_))
        ));
        assert_eq!(stack.crop(1, 1, 1, 1).unwrap().frame(0).unwrap(), &[4]);
    }

    #[test]
    fn test_crop_by_coordinates() {
        let stack = create_test_stack();
        // reversed bounds and out-of-frame values are normalised
        let result = stack.crop_by_coordinates(5.0, -5.0, 250.0, 90.0).unwrap();
        assert_eq!(result.x_count(), 51);
        assert_eq!(result.y_count(), 11);
        assert_eq!(result.scale().x_min, -5.0);
        assert_eq!(result.scale().y_min, 90.0);
        assert_eq!(result.scale().y_max, 100.0);
    }

    #[test]
    fn test_crop_center() {
        let stack = create_test_stack();
        let result = stack.crop_center(11, 1).unwrap();
        assert_eq!((result.x_count(), result.y_count()), (11, 1));
        assert_eq!(result.frame(0).unwrap()[0], stack.frame(0).unwrap()[50 * 101 + 45]);
        assert!(stack.crop_center(102, 1).is_err());
    }
}
