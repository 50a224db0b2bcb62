//! Error types for frame stack operations

use thiserror::Error;

/// Main error type for frame stack operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Axis not found: {0}")]
    AxisNotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Division by zero at frame {frame}, element {index}")]
    DivideByZero { frame: usize, index: usize },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FrameError {
    /// Shape mismatch between an expected and an actual size description
    pub fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        FrameError::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// True for structural violations (dimension map, axis permutation, tiling)
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            FrameError::AxisNotFound(_) | FrameError::InvalidOperation(_) | FrameError::Unsupported(_)
        )
    }
}

/// Specialized Result type for frame stack operations
pub type Result<T> = std::result::Result<T, FrameError>;

impl From<serde_json::Error> for FrameError {
    fn from(err: serde_json::Error) -> Self {
        FrameError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FrameError {
    fn from(err: ndarray::ShapeError) -> Self {
        FrameError::InvalidArgument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_message() {
        let err = FrameError::shape("4 x 4", "4 x 3");
        assert_eq!(err.to_string(), "Shape mismatch: expected 4 x 4, got 4 x 3");
        assert!(!err.is_structural());
    }

    #[test]
    fn test_structural_classification() {
        assert!(FrameError::AxisNotFound("Z".into()).is_structural());
        assert!(FrameError::Unsupported("z tiling".into()).is_structural());
        assert!(!FrameError::DivideByZero { frame: 0, index: 3 }.is_structural());
    }
}
