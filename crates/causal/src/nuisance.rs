//! # Nuisance Models
//!
//! First-stage predictors of the treatment and the outcome from the
//! covariates. The factory picks the problem type and wraps inputs and
//! outputs; model search and training are left to
//! [`TabularPredictor`](causeway_learn::TabularPredictor).
//!
//! | Model | Numeric input | Categorical input |
//! |-------|---------------|-------------------|
//! | treatment | regression | multiclass, holdout from class count |
//! | outcome | [`OutcomeModel::Single`] (one column) | [`OutcomeModel::Multi`] (several) |

use causeway_core::{Column, Frame, Matrix};
use causeway_learn::{
    FeatureGeneratorConfig, MultiOutputRegressor, Presets, ProblemType, Ridge, TabularConfig,
    TabularPredictor,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::debug;

use crate::encoder::TreatmentEncoder;
use crate::error::CausalError;

/// Bounds on the treatment model's holdout share for categorical
/// treatments.
pub const MIN_HOLDOUT_FRAC: f64 = 0.1;
pub const MAX_HOLDOUT_FRAC: f64 = 0.5;

/// L2 penalty of the non-parametric final stage.
pub const FINAL_STAGE_ALPHA: f64 = 1e-6;

/// Settings shared by every nuisance model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NuisanceConfig {
    pub hyperparameters: Option<Json>,
    pub presets: Presets,
    pub features: FeatureGeneratorConfig,
    pub num_gpus: usize,
    pub seed: u64,
}

impl Default for NuisanceConfig {
    fn default() -> Self {
        Self {
            hyperparameters: None,
            presets: Presets::default(),
            features: FeatureGeneratorConfig::default(),
            num_gpus: 0,
            seed: 0,
        }
    }
}

impl NuisanceConfig {
    fn tabular(&self, holdout_frac: Option<f64>) -> TabularConfig {
        TabularConfig {
            presets: self.presets,
            hyperparameters: self.hyperparameters.clone(),
            holdout_frac,
            features: self.features.clone(),
            num_gpus: self.num_gpus,
            seed: self.seed,
        }
    }
}

/// Predicts the treatment from the covariates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentModel {
    predictor: TabularPredictor,
}

impl TreatmentModel {
    pub fn problem_type(&self) -> ProblemType {
        self.predictor.problem_type()
    }

    pub fn predictor(&self) -> &TabularPredictor {
        &self.predictor
    }

    pub fn fit(
        &mut self,
        covariates: &Frame,
        treatment: &Column,
        encoder: &TreatmentEncoder,
    ) -> Result<(), CausalError> {
        if encoder.is_discrete() {
            let labels = encoder.indices(treatment)?;
            self.predictor
                .fit_classification(covariates, &labels, encoder.n_levels())?;
        } else {
            let values = encoder.encode(treatment)?.into_vec();
            self.predictor.fit_regression(covariates, &values)?;
        }
        Ok(())
    }

    /// Expected encoded treatment: the predicted value, or the predicted
    /// probabilities of every non-baseline level.
    pub fn predict(&self, covariates: &Frame, encoder: &TreatmentEncoder) -> Result<Matrix, CausalError> {
        if encoder.is_discrete() {
            let proba = self.predictor.predict_proba(covariates)?;
            let levels: Vec<usize> = (1..proba.cols()).collect();
            Ok(proba.select_columns(&levels))
        } else {
            Ok(Matrix::column_vector(self.predictor.predict(covariates)?))
        }
    }
}

/// Predicts the encoded outcome from the covariates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeModel {
    Single(TabularPredictor),
    Multi(MultiOutputRegressor),
}

impl OutcomeModel {
    pub fn fit(&mut self, covariates: &Frame, outcome: &Matrix) -> Result<(), CausalError> {
        match self {
            OutcomeModel::Single(p) => p.fit_regression(covariates, &outcome.column(0))?,
            OutcomeModel::Multi(m) => m.fit(covariates, outcome)?,
        }
        Ok(())
    }

    pub fn predict(&self, covariates: &Frame) -> Result<Matrix, CausalError> {
        Ok(match self {
            OutcomeModel::Single(p) => Matrix::column_vector(p.predict(covariates)?),
            OutcomeModel::Multi(m) => m.predict(covariates)?,
        })
    }
}

/// Builds unfitted nuisance models.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NuisanceFactory {
    config: NuisanceConfig,
}

impl NuisanceFactory {
    pub fn new(config: NuisanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NuisanceConfig {
        &self.config
    }

    /// Regression for a numeric treatment, multiclass otherwise. The
    /// multiclass holdout share grows with the number of classes.
    pub fn build_treatment_model(&self, covariates: &Frame, treatment: &Column) -> TreatmentModel {
        let (problem_type, holdout) = if treatment.kind().is_numeric() {
            (ProblemType::Regression, None)
        } else {
            let n_rows = covariates.n_rows().max(1) as f64;
            let frac = (treatment.n_unique() as f64 / n_rows).clamp(MIN_HOLDOUT_FRAC, MAX_HOLDOUT_FRAC);
            (ProblemType::Multiclass, Some(frac))
        };
        debug!(%problem_type, ?holdout, "treatment model");
        TreatmentModel {
            predictor: TabularPredictor::new(problem_type, self.config.tabular(holdout)),
        }
    }

    /// One regressor for a single outcome column, one per column otherwise.
    pub fn build_outcome_model(&self, outcome: &Matrix) -> OutcomeModel {
        let config = self.config.tabular(None);
        if outcome.cols() == 1 {
            OutcomeModel::Single(TabularPredictor::new(ProblemType::Regression, config))
        } else {
            OutcomeModel::Multi(MultiOutputRegressor::new(config))
        }
    }

    /// Final-stage regressions of the non-parametric estimator, one per
    /// outcome column.
    pub fn build_final_models(&self, outcome: &Matrix) -> Vec<Ridge> {
        (0..outcome.cols()).map(|_| Ridge::new(FINAL_STAGE_ALPHA)).collect()
    }
}
