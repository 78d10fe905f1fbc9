//! # Error Types
//!
//! Structural errors for frames and matrices: a column that is not there,
//! a column of the wrong length, or two matrices that cannot be combined.
//! Everything above this crate wraps `CoreError` rather than re-describing it.

use thiserror::Error;

/// Core errors for frames, matrices and logging setup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Matrix dimensions don't line up for the requested operation.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// A referenced column does not exist in the frame.
    #[error("Column not found: {name}")]
    MissingColumn { name: String },

    /// Two columns share a name.
    #[error("Duplicate column name: {name}")]
    DuplicateColumn { name: String },

    /// A column's length differs from the frame's row count.
    #[error("Column {name} has {got} rows, frame has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Cholesky factorisation failed.
    #[error("Matrix is singular or not positive definite")]
    SingularMatrix,

    /// Ragged input rows.
    #[error("Matrix rows have different lengths")]
    RaggedRows,

    /// The global subscriber could not be installed.
    #[error("Logging initialisation failed: {reason}")]
    Logging { reason: String },
}

impl CoreError {
    /// Shorthand for a `rows x cols` shape mismatch.
    pub fn shape(expected: (usize, usize), got: (usize, usize)) -> Self {
        CoreError::ShapeMismatch {
            expected: format!("{}x{}", expected.0, expected.1),
            got: format!("{}x{}", got.0, got.1),
        }
    }

    /// Shorthand for a missing column.
    pub fn missing(name: impl Into<String>) -> Self {
        CoreError::MissingColumn { name: name.into() }
    }
}
