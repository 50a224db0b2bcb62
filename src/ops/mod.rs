//! Dimensional operators.
//!
//! Every operator builds a new stack. Scale, units and tags are copied from
//! the (first) source; the source itself is never modified.

pub mod arith;
pub mod crop;
pub mod map;
pub mod reduce;
pub mod reorder;
pub mod transpose;

pub use arith::{ArithOp, ElementArith};
pub use map::MapStrategy;
