//! Error types for learners and model selection.

use causeway_core::CoreError;
use causeway_prep::PrepError;
use thiserror::Error;

/// Errors raised while fitting, selecting or tuning models.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LearnError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Prep(#[from] PrepError),

    /// Nothing to learn from.
    #[error("Training set is empty")]
    EmptyTrainingSet,

    /// `predict` called on a model that was never fitted.
    #[error("Model {model} is not fitted")]
    NotFitted { model: String },

    /// A hyperparameter is out of its valid range.
    #[error("Invalid hyperparameter {name}: {reason}")]
    InvalidHyperparameter { name: String, reason: String },

    /// A model family name that the registry does not know.
    #[error("Unknown model family: {name}")]
    UnknownModel { name: String },

    /// The model was fitted on a different number of features.
    #[error("Feature count mismatch: expected {expected}, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    /// A class index outside `0..n_classes`.
    #[error("Label {label} out of range for {n_classes} classes")]
    InvalidLabel { label: usize, n_classes: usize },

    /// No candidate model could be tried for the problem type.
    #[error("No candidate models for {problem_type}")]
    NoCandidates { problem_type: String },

    /// A predictor was asked for output its problem type cannot give.
    #[error("Predictor solves {actual}, not {requested}")]
    ProblemTypeMismatch { requested: String, actual: String },

    /// A configuration document could not be read.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A tuning objective did not report the metric being optimised.
    #[error("Trial {trial} did not report metric {metric}")]
    MissingMetric { trial: usize, metric: String },
}

impl From<serde_json::Error> for LearnError {
    fn from(e: serde_json::Error) -> Self {
        LearnError::Config(e.to_string())
    }
}
