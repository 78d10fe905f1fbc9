//! Error types for causal estimation.

use causeway_core::CoreError;
use causeway_learn::LearnError;
use causeway_prep::PrepError;
use thiserror::Error;

/// Errors raised while fitting or querying a causal model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CausalError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Prep(#[from] PrepError),

    /// A nuisance or final-stage learner failed.
    #[error(transparent)]
    Learn(#[from] LearnError),

    /// `predict_effect` before `fit`.
    #[error("Causal model is not fitted")]
    NotFitted,

    /// Inputs rejected before any training.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The fitted estimator cannot produce confidence intervals.
    #[error("{estimator} estimator does not support effect intervals")]
    IntervalUnavailable { estimator: String },

    /// Reading or writing a model artifact failed.
    #[error("Artifact error at {path}: {reason}")]
    Artifact { path: String, reason: String },
}

impl CausalError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        CausalError::Validation(msg.into())
    }
}
