//! # Learn - In-Process Learners and Model Selection
//!
//! Everything the causal estimators need to fit nuisance models without
//! leaving the process:
//!
//! - **Learners**: ridge, multinomial logistic, k-nearest-neighbour and
//!   baseline models behind the [`Regressor`] and [`Classifier`] traits
//! - **Bayesian ridge**: evidence-maximising linear regression with
//!   predictive standard deviations
//! - **Feature generation**: frame to design matrix, learned once and
//!   replayed on new rows
//! - **Model selection**: [`TabularPredictor`] ranks candidates on a seeded
//!   holdout and refits the winner
//! - **Random search**: [`tuner::Tuner`] evaluates sampled configurations
//!   in parallel with `rayon`
//!
//! ## Determinism
//!
//! Every source of randomness takes an explicit seed. Two fits with the
//! same data, configuration and seed produce the same model.

pub mod automl;
pub mod bayes;
pub mod error;
pub mod features;
pub mod knn;
pub mod linear;
pub mod metrics;
pub mod multi;
pub mod optim;
pub mod registry;
pub mod softmax;
pub mod split;
pub mod traits;
pub mod tuner;

pub use automl::{FittedModel, LeaderboardEntry, TabularConfig, TabularPredictor};
pub use bayes::{BayesianRidge, BayesianRidgeParams, Posterior};
pub use error::LearnError;
pub use features::{FeatureGenerator, FeatureGeneratorConfig};
pub use knn::{KnnClassifier, KnnRegressor};
pub use linear::{MeanRegressor, Ridge};
pub use multi::MultiOutputRegressor;
pub use registry::{available_models, ModelConfig, ModelFamily, Presets, ProblemType};
pub use softmax::{PriorClassifier, SoftmaxClassifier, SoftmaxParams};
pub use traits::{argmax, Classifier, Regressor};
