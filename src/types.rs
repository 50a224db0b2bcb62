//! Core element types for frame stacks

use crate::minmax::{self, ComplexMinMax, MinMaxScalar};
use num_complex::Complex;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element types a frame stack can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    /// Unsigned 8-bit integer
    U8 = 1,
    /// Unsigned 16-bit integer
    U16 = 2,
    /// Unsigned 32-bit integer
    U32 = 3,
    /// Unsigned 64-bit integer
    U64 = 4,
    /// Signed 8-bit integer
    I8 = 5,
    /// Signed 16-bit integer
    I16 = 6,
    /// Signed 32-bit integer
    I32 = 7,
    /// Signed 64-bit integer
    I64 = 8,
    /// 32-bit floating point
    F32 = 9,
    /// 64-bit floating point
    F64 = 10,
    /// Complex pair of 32-bit floats
    Complex32 = 11,
    /// Complex pair of 64-bit floats
    Complex64 = 12,
}

impl DataType {
    /// Size in bytes of this data type
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::U64 | DataType::I64 | DataType::F64 | DataType::Complex32 => 8,
            DataType::Complex64 => 16,
        }
    }

    /// Check if this is a real floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Check if this is a complex type
    pub fn is_complex(&self) -> bool {
        matches!(self, DataType::Complex32 | DataType::Complex64)
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        !self.is_float() && !self.is_complex()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Cached value range of one frame.
///
/// Scalar elements carry a single channel. Complex elements carry four:
/// real, imaginary, magnitude and phase, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRange {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl FrameRange {
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Self {
        Self { min, max }
    }

    /// Single-channel range
    pub fn scalar(min: f64, max: f64) -> Self {
        Self {
            min: vec![min],
            max: vec![max],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.min.len()
    }

    pub fn is_valid(&self) -> bool {
        self.min.len() == self.max.len()
            && self
                .min
                .iter()
                .zip(self.max.iter())
                .all(|(lo, hi)| lo.is_finite() && hi.is_finite() && lo <= hi)
    }
}

/// Running min/max collector used while an operator produces new content.
pub trait RangeAccumulator<T>: Default + Send {
    fn push(&mut self, value: T);

    fn merge(&mut self, other: Self);

    /// `None` when the collected extrema cannot be expressed as `f64`
    fn finish(self) -> Option<FrameRange>;
}

mod sealed {
    pub trait Sealed {}
}

/// Element types storable in a [`crate::FrameStack`].
///
/// Sealed: the set of instantiations is closed.
pub trait Element:
    bytemuck::Pod + Default + fmt::Debug + PartialEq + Send + Sync + 'static + sealed::Sealed
{
    const DATA_TYPE: DataType;

    /// Number of statistic channels in this type's [`FrameRange`]
    const RANGE_CHANNELS: usize;

    type Accumulator: RangeAccumulator<Self>;

    /// Compute the value range of a buffer
    fn value_range(data: &[Self], min_partition_len: usize) -> FrameRange;
}

/// Scalar min/max collector
#[derive(Debug, Clone, Copy)]
pub struct ScalarAccumulator<T> {
    min: T,
    max: T,
    seen: bool,
}

impl<T: MinMaxScalar> Default for ScalarAccumulator<T> {
    fn default() -> Self {
        Self {
            min: T::MIN_SEED,
            max: T::MAX_SEED,
            seen: false,
        }
    }
}

impl<T: MinMaxScalar> ScalarAccumulator<T> {
    fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

impl<T: MinMaxScalar> RangeAccumulator<T> for ScalarAccumulator<T> {
    #[inline]
    fn push(&mut self, value: T) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.seen = true;
    }

    fn merge(&mut self, other: Self) {
        if !other.seen || !other.is_ordered() {
            return;
        }
        self.push(other.min);
        self.push(other.max);
    }

    /// No ordered value seen (empty, or only NaN) gives the zero range
    fn finish(self) -> Option<FrameRange> {
        if !self.seen || !self.is_ordered() {
            return Some(FrameRange::scalar(0.0, 0.0));
        }
        Some(FrameRange::scalar(self.min.to_f64()?, self.max.to_f64()?))
    }
}

/// Complex min/max collector tracking real, imaginary, squared magnitude and phase
#[derive(Debug, Clone, Copy)]
pub struct ComplexAccumulator {
    extrema: ComplexMinMax,
    seen: bool,
}

impl Default for ComplexAccumulator {
    fn default() -> Self {
        Self {
            extrema: ComplexMinMax::seed(),
            seen: false,
        }
    }
}

impl<F: num_traits::Float> RangeAccumulator<Complex<F>> for ComplexAccumulator {
    #[inline]
    fn push(&mut self, value: Complex<F>) {
        if let (Some(re), Some(im)) = (value.re.to_f64(), value.im.to_f64()) {
            self.extrema.push(re, im);
            self.seen = true;
        }
    }

    fn merge(&mut self, other: Self) {
        if other.seen {
            self.extrema.merge(&other.extrema);
            self.seen = true;
        }
    }

    fn finish(self) -> Option<FrameRange> {
        if !self.seen {
            return Some(FrameRange::new(vec![0.0; 4], vec![0.0; 4]));
        }
        Some(self.extrema.finalize().to_frame_range())
    }
}

macro_rules! impl_scalar_element {
    ($($t:ty => $dt:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Element for $t {
                const DATA_TYPE: DataType = DataType::$dt;
                const RANGE_CHANNELS: usize = 1;
                type Accumulator = ScalarAccumulator<$t>;

                fn value_range(data: &[Self], min_partition_len: usize) -> FrameRange {
                    let found = minmax::find_min_max_with(data, min_partition_len);
                    FrameRange::scalar(found.min as f64, found.max as f64)
                }
            }
        )*
    };
}

impl_scalar_element!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

macro_rules! impl_complex_element {
    ($($t:ty => $dt:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for Complex<$t> {}

            impl Element for Complex<$t> {
                const DATA_TYPE: DataType = DataType::$dt;
                const RANGE_CHANNELS: usize = 4;
                type Accumulator = ComplexAccumulator;

                fn value_range(data: &[Self], min_partition_len: usize) -> FrameRange {
                    minmax::find_complex_min_max_with(data, min_partition_len).to_frame_range()
                }
            }
        )*
    };
}

impl_complex_element!(f32 => Complex32, f64 => Complex64);
