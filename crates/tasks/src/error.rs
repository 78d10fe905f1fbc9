//! Error types for task runners.

use causeway_causal::CausalError;
use causeway_core::CoreError;
use causeway_learn::LearnError;
use causeway_prep::PrepError;
use thiserror::Error;

/// Errors raised by a task before or while it runs.
///
/// Data problems a caller can fix are reported as validations on a failed
/// [`TaskResult`](crate::TaskResult) instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Prep(#[from] PrepError),

    #[error(transparent)]
    Learn(#[from] LearnError),

    #[error(transparent)]
    Causal(#[from] CausalError),

    /// A prior that cannot be matched to an expanded feature.
    #[error("Invalid prior for {column}: {reason}")]
    InvalidPrior { column: String, reason: String },

    /// A task parameter outside its valid range.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl TaskError {
    pub(crate) fn parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TaskError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
