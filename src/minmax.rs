//! Parallel min/max kernel.
//!
//! Buffers are split into contiguous partitions that run on the rayon pool.
//! Each partition is scanned in `SIMD_LANES`-wide batches with one running
//! extremum per lane (laid out so the compiler lowers it to vector min/max),
//! the lanes are reduced horizontally, and the unaligned tail is scanned
//! scalar. Partition results are merged into one accumulator under a single
//! mutex, one lock per partition.

use crate::types::FrameRange;
use crate::utils::partition_len;
use num_complex::Complex;
use num_traits::{Float, ToPrimitive};
use parking_lot::Mutex;
use rayon::prelude::*;

/// Number of lanes processed per batch
pub const SIMD_LANES: usize = 8;

/// Smallest partition handed to a worker
pub const DEFAULT_MIN_PARTITION_LEN: usize = 16 * 1024;

/// Scalar types the kernel can scan
pub trait MinMaxScalar: Copy + PartialOrd + Default + Send + Sync + ToPrimitive {
    /// Seed of the running minimum
    const MIN_SEED: Self;
    /// Seed of the running maximum
    const MAX_SEED: Self;
}

macro_rules! impl_integer_scalar {
    ($($t:ty),*) => {
        $(impl MinMaxScalar for $t {
            const MIN_SEED: Self = <$t>::MAX;
            const MAX_SEED: Self = <$t>::MIN;
        })*
    };
}

macro_rules! impl_float_scalar {
    ($($t:ty),*) => {
        $(impl MinMaxScalar for $t {
            const MIN_SEED: Self = <$t>::INFINITY;
            const MAX_SEED: Self = <$t>::NEG_INFINITY;
        })*
    };
}

impl_integer_scalar!(u8, u16, u32, u64, i8, i16, i32, i64);
impl_float_scalar!(f32, f64);

/// Global extrema of a buffer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MinMax<T> {
    pub min: T,
    pub max: T,
}

impl<T: MinMaxScalar> MinMax<T> {
    fn seed() -> Self {
        Self {
            min: T::MIN_SEED,
            max: T::MAX_SEED,
        }
    }

    #[inline]
    fn merge(&mut self, other: &Self) {
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
    }

    /// Untouched seeds (no ordered value seen) collapse to the default
    fn settle(self) -> Self {
        if self.min <= self.max {
            self
        } else {
            Self::default()
        }
    }
}

/// Find the minimum and maximum of `data`.
///
/// Empty input returns `MinMax::default()` (both zero). NaN never wins a
/// comparison, so a float buffer holding only NaN reports the same zeros.
pub fn find_min_max<T: MinMaxScalar>(data: &[T]) -> MinMax<T> {
    find_min_max_with(data, DEFAULT_MIN_PARTITION_LEN)
}

/// [`find_min_max`] with an explicit smallest partition length
pub fn find_min_max_with<T: MinMaxScalar>(data: &[T], min_partition_len: usize) -> MinMax<T> {
    if data.is_empty() {
        return MinMax::default();
    }

    let part = partition_len(data.len(), min_partition_len, rayon::current_num_threads());
    if part >= data.len() {
        return scan_partition(data).settle();
    }

    let global = Mutex::new(MinMax::seed());
    data.par_chunks(part).for_each(|chunk| {
        let local = scan_partition(chunk);
        global.lock().merge(&local);
    });
    global.into_inner().settle()
}

/// Batched scan of one partition
#[inline]
fn scan_partition<T: MinMaxScalar>(data: &[T]) -> MinMax<T> {
    let mut lo = [T::MIN_SEED; SIMD_LANES];
    let mut hi = [T::MAX_SEED; SIMD_LANES];

    let mut batches = data.chunks_exact(SIMD_LANES);
    for batch in &mut batches {
        for lane in 0..SIMD_LANES {
            let v = batch[lane];
            lo[lane] = if v < lo[lane] { v } else { lo[lane] };
            hi[lane] = if v > hi[lane] { v } else { hi[lane] };
        }
    }

    let mut result = MinMax::seed();
    for lane in 0..SIMD_LANES {
        result.merge(&MinMax {
            min: lo[lane],
            max: hi[lane],
        });
    }

    for &v in batches.remainder() {
        if v < result.min {
            result.min = v;
        }
        if v > result.max {
            result.max = v;
        }
    }

    result
}

/// Extrema of a complex buffer.
///
/// All five channels are tracked in one pass. Magnitude is derived from the
/// squared magnitude only after the final merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexMinMax {
    pub real: MinMax<f64>,
    pub imaginary: MinMax<f64>,
    pub magnitude: MinMax<f64>,
    pub phase: MinMax<f64>,
    pub magnitude_squared: MinMax<f64>,
}

impl Default for ComplexMinMax {
    fn default() -> Self {
        Self {
            real: MinMax::default(),
            imaginary: MinMax::default(),
            magnitude: MinMax::default(),
            phase: MinMax::default(),
            magnitude_squared: MinMax::default(),
        }
    }
}

impl ComplexMinMax {
    pub(crate) fn seed() -> Self {
        Self {
            real: MinMax::seed(),
            imaginary: MinMax::seed(),
            magnitude: MinMax::seed(),
            phase: MinMax::seed(),
            magnitude_squared: MinMax::seed(),
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, re: f64, im: f64) {
        let sample = |v: f64| MinMax { min: v, max: v };
        self.real.merge(&sample(re));
        self.imaginary.merge(&sample(im));
        self.magnitude_squared.merge(&sample(re * re + im * im));
        self.phase.merge(&sample(im.atan2(re)));
    }

    pub(crate) fn merge(&mut self, other: &Self) {
        self.real.merge(&other.real);
        self.imaginary.merge(&other.imaginary);
        self.magnitude_squared.merge(&other.magnitude_squared);
        self.phase.merge(&other.phase);
    }

    /// Take the square root of the squared-magnitude extrema.
    pub(crate) fn finalize(mut self) -> Self {
        if self.magnitude_squared.min > self.magnitude_squared.max {
            return Self::default();
        }
        self.magnitude = MinMax {
            min: self.magnitude_squared.min.sqrt(),
            max: self.magnitude_squared.max.sqrt(),
        };
        self
    }

    /// Real, imaginary, magnitude and phase channels
    pub fn to_frame_range(&self) -> FrameRange {
        FrameRange::new(
            vec![self.real.min, self.imaginary.min, self.magnitude.min, self.phase.min],
            vec![self.real.max, self.imaginary.max, self.magnitude.max, self.phase.max],
        )
    }
}

/// Find the complex extrema of `data`; empty input returns all zeros.
pub fn find_complex_min_max<F>(data: &[Complex<F>]) -> ComplexMinMax
where
    F: Float + Send + Sync,
{
    find_complex_min_max_with(data, DEFAULT_MIN_PARTITION_LEN)
}

/// [`find_complex_min_max`] with an explicit smallest partition length
pub fn find_complex_min_max_with<F>(data: &[Complex<F>], min_partition_len: usize) -> ComplexMinMax
where
    F: Float + Send + Sync,
{
    if data.is_empty() {
        return ComplexMinMax::default();
    }

    let scan = |chunk: &[Complex<F>]| {
        let mut local = ComplexMinMax::seed();
        for c in chunk {
            if let (Some(re), Some(im)) = (c.re.to_f64(), c.im.to_f64()) {
                local.push(re, im);
            }
        }
        local
    };

    let part = partition_len(data.len(), min_partition_len, rayon::current_num_threads());
    if part >= data.len() {
        return scan(data).finalize();
    }

    let global = Mutex::new(ComplexMinMax::seed());
    data.par_chunks(part).for_each(|chunk| {
        let local = scan(chunk);
        global.lock().merge(&local);
    });
    global.into_inner().finalize()
}
