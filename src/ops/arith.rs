//! Element-wise arithmetic between stacks and with scalars

use crate::config::EngineConfig;
use crate::error::{FrameError, Result};
use crate::ops::map::MapStrategy;
use crate::stack::FrameStack;
use crate::types::{Element, FrameRange, RangeAccumulator};
use num_complex::Complex;
use num_traits::Zero;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Binary element operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithOp {
    /// `None` only for a division by an exact zero
    #[inline]
    pub fn apply<T: ElementArith>(self, lhs: T, rhs: T) -> Option<T> {
        match self {
            ArithOp::Add => Some(lhs.add_elem(rhs)),
            ArithOp::Subtract => Some(lhs.sub_elem(rhs)),
            ArithOp::Multiply => Some(lhs.mul_elem(rhs)),
            ArithOp::Divide => lhs.div_elem(rhs),
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArithOp::Add => "add",
            ArithOp::Subtract => "subtract",
            ArithOp::Multiply => "multiply",
            ArithOp::Divide => "divide",
        };
        write!(f, "{}", name)
    }
}

/// Arithmetic on stack elements. Integers wrap on overflow.
pub trait ElementArith: Element {
    fn add_elem(self, rhs: Self) -> Self;

    fn sub_elem(self, rhs: Self) -> Self;

    fn mul_elem(self, rhs: Self) -> Self;

    /// `None` when `rhs` is exactly zero
    fn div_elem(self, rhs: Self) -> Option<Self>;
}

macro_rules! impl_integer_arith {
    ($($t:ty),*) => {
        $(
            impl ElementArith for $t {
                #[inline]
                fn add_elem(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }

                #[inline]
                fn sub_elem(self, rhs: Self) -> Self {
                    self.wrapping_sub(rhs)
                }

                #[inline]
                fn mul_elem(self, rhs: Self) -> Self {
                    self.wrapping_mul(rhs)
                }

                #[inline]
                fn div_elem(self, rhs: Self) -> Option<Self> {
                    if rhs == 0 {
                        None
                    } else {
                        Some(self.wrapping_div(rhs))
                    }
                }
            }
        )*
    };
}

impl_integer_arith!(u8, u16, u32, u64, i8, i16, i32, i64);

macro_rules! impl_field_arith {
    ($($t:ty),*) => {
        $(
            impl ElementArith for $t {
                #[inline]
                fn add_elem(self, rhs: Self) -> Self {
                    self + rhs
                }

                #[inline]
                fn sub_elem(self, rhs: Self) -> Self {
                    self - rhs
                }

                #[inline]
                fn mul_elem(self, rhs: Self) -> Self {
                    self * rhs
                }

                #[inline]
                fn div_elem(self, rhs: Self) -> Option<Self> {
                    if rhs.is_zero() {
                        None
                    } else {
                        Some(self / rhs)
                    }
                }
            }
        )*
    };
}

impl_field_arith!(f32, f64, Complex<f32>, Complex<f64>);

impl<T: ElementArith> FrameStack<T> {
    /// Combine two stacks frame by frame, element by element.
    ///
    /// Frame size and count must match. When both stacks carry a dimension
    /// map the maps are compared under `config.dimension_strictness`. The
    /// result keeps the scale, tags and dimensions of `self`.
    #[instrument(skip(self, other, config), fields(frames = self.frame_count()))]
    pub fn elementwise(&self, other: &FrameStack<T>, op: ArithOp, config: &EngineConfig) -> Result<FrameStack<T>> {
        if self.x_count() != other.x_count() || self.y_count() != other.y_count() {
            return Err(FrameError::shape(
                format!("{} x {} frames", self.x_count(), self.y_count()),
                format!("{} x {} frames", other.x_count(), other.y_count()),
            ));
        }
        if self.frame_count() != other.frame_count() {
            return Err(FrameError::shape(
                format!("{} frames", self.frame_count()),
                format!("{} frames", other.frame_count()),
            ));
        }
        if !self.dimensions().is_empty() && !other.dimensions().is_empty() {
            self.dimensions()
                .check_compatible(other.dimensions(), config.dimension_strictness)?;
        }

        let combined: Vec<(Arc<Vec<T>>, Option<FrameRange>)> = self
            .shared_frames()
            .par_iter()
            .zip(other.shared_frames().par_iter())
            .enumerate()
            .map(|(frame, (lhs, rhs))| -> Result<(Arc<Vec<T>>, Option<FrameRange>)> {
                let mut acc = T::Accumulator::default();
                let mut out = Vec::with_capacity(lhs.len());
                for (index, (&a, &b)) in lhs.iter().zip(rhs.iter()).enumerate() {
                    let value = op
                        .apply(a, b)
                        .ok_or(FrameError::DivideByZero { frame, index })?;
                    acc.push(value);
                    out.push(value);
                }
                Ok((Arc::new(out), acc.finish()))
            })
            .collect::<Result<_>>()?;

        let (frames, ranges) = combined.into_iter().unzip();
        let mut result = self.derive(self.x_count(), self.y_count(), frames, ranges);
        result.set_dimensions(self.dimensions().clone());
        Ok(result)
    }

    pub fn add(&self, other: &FrameStack<T>) -> Result<FrameStack<T>> {
        self.elementwise(other, ArithOp::Add, &EngineConfig::default())
    }

    pub fn subtract(&self, other: &FrameStack<T>) -> Result<FrameStack<T>> {
        self.elementwise(other, ArithOp::Subtract, &EngineConfig::default())
    }

    pub fn multiply(&self, other: &FrameStack<T>) -> Result<FrameStack<T>> {
        self.elementwise(other, ArithOp::Multiply, &EngineConfig::default())
    }

    /// Fails with [`FrameError::DivideByZero`] on the first zero divisor found
    pub fn divide(&self, other: &FrameStack<T>) -> Result<FrameStack<T>> {
        self.elementwise(other, ArithOp::Divide, &EngineConfig::default())
    }

    /// Multiply every element by `factor`
    pub fn scale_by(&self, factor: T) -> FrameStack<T> {
        self.map(|v, _, _, _| v.mul_elem(factor), MapStrategy::Auto)
    }

    /// Add `offset` to every element
    pub fn offset_by(&self, offset: T) -> FrameStack<T> {
        self.map(|v, _, _, _| v.add_elem(offset), MapStrategy::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;
    use crate::config::DimensionStrictness;

    fn stack_of(frames: Vec<Vec<i16>>, axis: &str) -> FrameStack<i16> {
        let count = frames.len();
        let mut stack = FrameStack::from_frames(2, 1, frames).unwrap();
        stack.define_dimensions(vec![Axis::index_based(axis, count)]).unwrap();
        stack
    }

    #[test]
    fn test_integer_ops_wrap() {
        let a = stack_of(vec![vec![i16::MAX, 5], vec![-3, 7]], "Z");
        let b = stack_of(vec![vec![1, 2], vec![4, -2]], "Z");

        assert_eq!(a.add(&b).unwrap().frame(0).unwrap(), &[i16::MIN, 7]);
        assert_eq!(a.subtract(&b).unwrap().frame(1).unwrap(), &[-7, 9]);
        assert_eq!(a.multiply(&b).unwrap().frame(1).unwrap(), &[-12, -14]);
        let quotient = a.divide(&b).unwrap();
        assert_eq!(quotient.frame(0).unwrap(), &[i16::MAX, 2]);
        assert_eq!(quotient.dimensions().to_string(), "Z[2]");
        assert_eq!(quotient.min_max_arrays(1).unwrap(), (vec![-3.0], vec![0.0]));
    }

    #[test]
    fn test_divide_by_zero_reports_position() {
        let a = stack_of(vec![vec![1, 2], vec![3, 4]], "Z");
        let b = stack_of(vec![vec![1, 1], vec![1, 0]], "Z");
        assert_eq!(
            a.divide(&b).unwrap_err(),
            FrameError::DivideByZero { frame: 1, index: 1 }
        );

        let x = FrameStack::from_frames(1, 1, vec![vec![1.0f64]]).unwrap();
        let zero = FrameStack::from_frames(1, 1, vec![vec![-0.0f64]]).unwrap();
        assert!(matches!(x.divide(&zero), Err(FrameError::DivideByZero { .. })));
    }

    #[test]
    fn test_shape_checks() {
        let a = stack_of(vec![vec![1, 2], vec![3, 4]], "Z");
        let fewer = stack_of(vec![vec![1, 2]], "Z");
        assert!(matches!(a.add(&fewer), Err(FrameError::ShapeMismatch { .. })));

        let wider = FrameStack::from_frames(1, 2, vec![vec![1i16, 2], vec![3, 4]]).unwrap();
        assert!(matches!(a.add(&wider), Err(FrameError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_axis_name_strictness() {
        let a = stack_of(vec![vec![1, 2], vec![3, 4]], "Z");
        let b = stack_of(vec![vec![1, 1], vec![1, 1]], "Time");

        assert!(a.add(&b).is_ok());
        let strict = EngineConfig::default().with_dimension_strictness(DimensionStrictness::Strict);
        assert!(matches!(
            a.elementwise(&b, ArithOp::Add, &strict),
            Err(FrameError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_complex_multiply() {
        let a = FrameStack::from_frames(1, 1, vec![vec![Complex::new(1.0f32, 2.0)]]).unwrap();
        let b = FrameStack::from_frames(1, 1, vec![vec![Complex::new(0.0f32, 1.0)]]).unwrap();
        assert_eq!(a.multiply(&b).unwrap().frame(0).unwrap(), &[Complex::new(-2.0, 1.0)]);
    }

    #[test]
    fn test_scalar_variants() {
        let stack = FrameStack::from_frames(2, 1, vec![vec![250u8, 3]]).unwrap();
        assert_eq!(stack.offset_by(10).frame(0).unwrap(), &[4, 13]);
        assert_eq!(stack.scale_by(2).frame(0).unwrap(), &[244, 6]);
        assert_eq!(ArithOp::Divide.to_string(), "divide");
    }
}
