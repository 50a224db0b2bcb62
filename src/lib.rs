//! framestack - strided multi-dimensional frame stacks for microscopy imaging
//!
//! A [`FrameStack`] holds an ordered list of equally sized 2D frames plus a
//! dimension map that lays them out along named axes (Channel, Z, Time, FOV,
//! ...). Axis 0 of the map varies fastest.
//!
//! # Features
//!
//! - Dimensional operators: transpose, reorder, snap, slice, extract, crop,
//!   map, reduce and element-wise arithmetic
//! - Parallel SIMD-batched min/max kernel with a complex-number variant
//! - Maximum / minimum / average intensity projections along X, Y or Z
//! - Tiled FOV axes: mosaic origin generation and overlap validation
//!
//! All data-parallel work runs on rayon. Execution knobs live in
//! [`EngineConfig`] and are passed explicitly.
//!
//! # Example
//!
//! ```rust
//! use framestack::{Axis, FrameStack, ProjectionAxis, ProjectionMode, ProjectionStrategy};
//!
//! # fn example() -> framestack::Result<()> {
//! let frames = (0..6u16).map(|f| vec![f; 4]).collect();
//! let mut stack = FrameStack::from_frames(2, 2, frames)?;
//! stack.define_dimensions(vec![Axis::index_based("Channel", 2), Axis::index_based("Z", 3)])?;
//!
//! let channel = stack.snap_to("Channel", 1, false)?;
//! let mip = channel.project(ProjectionAxis::Z, ProjectionMode::Maximum, ProjectionStrategy::default())?;
//! assert_eq!(mip.frame(0)?, &[5, 5, 5, 5]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod axis;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod fov;
pub mod metadata;
pub mod minmax;
pub mod ops;
pub mod projection;
pub mod stack;
pub mod types;
pub mod utils;

// Re-exports
pub use axis::Axis;
pub use config::{DimensionStrictness, EngineConfig};
pub use dimensions::Dimensions;
pub use error::{FrameError, Result};
pub use fov::{FovAxis, FovOrigin, OverlapReport, TileGeometry, TileLayout};
pub use metadata::{Metadata, Scale};
pub use ops::{ArithOp, ElementArith, MapStrategy};
pub use projection::{Projectable, ProjectionAxis, ProjectionMode, ProjectionStrategy, VolumeView};
pub use stack::FrameStack;
pub use types::{DataType, Element, FrameRange};

/// Version of the framestack implementation
pub const FRAMESTACK_VERSION: &str = env!("CARGO_PKG_VERSION");
