//! Error types for preprocessing.

use causeway_core::{ColumnKind, CoreError};
use thiserror::Error;

/// Errors raised while cleaning or encoding a frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrepError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The percentage pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The strategy has no meaning for this kind of column.
    #[error("Strategy {strategy} cannot impute {kind} column {column}")]
    UnsupportedStrategy {
        strategy: String,
        kind: ColumnKind,
        column: String,
    },

    /// A learned fill value does not fit the column it is applied to.
    #[error("Cannot fill column {column} with {fill}")]
    FillTypeMismatch { column: String, fill: String },

    #[error("Polynomial degree must be at least 1, got {0}")]
    InvalidDegree(usize),
}
