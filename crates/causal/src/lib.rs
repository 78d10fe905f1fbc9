//! # Causal - Intervention Effects by Double Machine Learning
//!
//! Estimates how a target responds when a treatment column is moved from
//! its observed value to a new one:
//!
//! - **Encoding**: numeric targets pass through, categorical targets become
//!   clipped logits ([`encoder`])
//! - **Nuisances**: treatment and outcome models chosen by column kind
//!   ([`nuisance`])
//! - **Estimators**: linear DML with intervals, non-parametric DML without
//!   ([`dml`])
//! - **Orchestration**: [`InterventionEffectPredictor`] validates, fits,
//!   persists and predicts
//!
//! Fitted predictors serialize to JSON; [`artifact`] writes them to fresh
//! directories and [`versioned`] tags them for deployment.

pub mod artifact;
pub mod dml;
pub mod encoder;
pub mod error;
pub mod gaussian;
pub mod nuisance;
pub mod predictor;
pub mod versioned;

pub use dml::{build, CausalEstimator, DmlSettings, EstimatorKind, LinearDml, NonParamDml};
pub use encoder::{Decoded, OutcomeEncoder, TreatmentEncoder};
pub use error::CausalError;
pub use gaussian::Normal;
pub use nuisance::{NuisanceConfig, NuisanceFactory, OutcomeModel, TreatmentModel};
pub use predictor::{
    EffectTable, FitReport, InterventionConfig, InterventionEffectPredictor, IntervalBounds,
};
pub use versioned::{
    InterventionalModel, TabularModelInterventional, VersionedModel, MODEL_DEPLOYMENT_VERSION,
};
