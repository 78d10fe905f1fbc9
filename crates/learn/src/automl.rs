//! # Tabular Model Selection
//!
//! [`TabularPredictor`] takes a frame of covariates and a target, builds
//! the feature matrix, tries every candidate configuration on a seeded
//! holdout split and refits the winner on all rows.
//!
//! Candidates are scored by R² for regression and by negative log-loss for
//! classification, so higher is always better. With fewer than
//! [`MIN_HOLDOUT_ROWS`] rows there is nothing to hold out and candidates
//! are scored on the training rows.
//!
//! ```rust
//! use causeway_core::{Column, Frame};
//! use causeway_learn::{ProblemType, TabularConfig, TabularPredictor};
//!
//! let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
//! let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
//! let frame = Frame::new(vec![Column::float("x", x)]).unwrap();
//!
//! let mut predictor = TabularPredictor::new(ProblemType::Regression, TabularConfig::default());
//! predictor.fit_regression(&frame, &y).unwrap();
//! let pred = predictor.predict(&frame).unwrap();
//! assert!((pred[10] - 31.0).abs() < 1.0);
//! ```

use causeway_core::{CoreError, Frame, Matrix};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::{debug, info, warn};

use crate::error::LearnError;
use crate::features::{FeatureGenerator, FeatureGeneratorConfig};
use crate::knn::{KnnClassifier, KnnRegressor};
use crate::linear::{MeanRegressor, Ridge};
use crate::metrics;
use crate::registry::{default_candidates, hyperparameters_to_candidates, ModelConfig, Presets, ProblemType};
use crate::softmax::{PriorClassifier, SoftmaxClassifier};
use crate::split::train_test_split;
use crate::traits::{argmax, Classifier, Regressor};

/// Below this many rows candidates are scored on the training rows.
pub const MIN_HOLDOUT_ROWS: usize = 10;

pub const DEFAULT_HOLDOUT_FRAC: f64 = 0.2;

/// Options for [`TabularPredictor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularConfig {
    pub presets: Presets,
    /// Family name to parameters, see [`crate::registry`]. `None` uses the
    /// preset's built-in candidates.
    pub hyperparameters: Option<Json>,
    /// Share of rows held out for model selection.
    pub holdout_frac: Option<f64>,
    pub features: FeatureGeneratorConfig,
    /// Accepted for compatibility; every learner runs on the CPU.
    pub num_gpus: usize,
    pub seed: u64,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            presets: Presets::default(),
            hyperparameters: None,
            holdout_frac: None,
            features: FeatureGeneratorConfig::default(),
            num_gpus: 0,
            seed: 0,
        }
    }
}

impl TabularConfig {
    /// Candidates usable for `problem_type`.
    pub fn candidates(&self, problem_type: ProblemType) -> Result<Vec<ModelConfig>, LearnError> {
        let all = match &self.hyperparameters {
            Some(hp) => hyperparameters_to_candidates(hp)?,
            None => default_candidates(problem_type, self.presets),
        };
        let usable: Vec<ModelConfig> = all
            .into_iter()
            .filter(|c| c.family().supports(problem_type))
            .collect();
        if usable.is_empty() {
            return Err(LearnError::NoCandidates {
                problem_type: problem_type.to_string(),
            });
        }
        Ok(usable)
    }
}

/// A trained learner of any family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FittedModel {
    Ridge(Ridge),
    Mean(MeanRegressor),
    KnnRegressor(KnnRegressor),
    Softmax(SoftmaxClassifier),
    Prior(PriorClassifier),
    KnnClassifier(KnnClassifier),
}

#[derive(Debug, Clone)]
enum Target {
    Continuous(Vec<f64>),
    Classes { labels: Vec<usize>, n_classes: usize },
}

impl Target {
    fn select(&self, rows: &[usize]) -> Target {
        match self {
            Target::Continuous(y) => Target::Continuous(rows.iter().map(|&r| y[r]).collect()),
            Target::Classes { labels, n_classes } => Target::Classes {
                labels: rows.iter().map(|&r| labels[r]).collect(),
                n_classes: *n_classes,
            },
        }
    }
}

fn mismatch(requested: &str, config: &ModelConfig) -> LearnError {
    LearnError::ProblemTypeMismatch {
        requested: requested.into(),
        actual: config.family().to_string(),
    }
}

impl FittedModel {
    fn train(config: &ModelConfig, x: &Matrix, target: &Target) -> Result<Self, LearnError> {
        match target {
            Target::Continuous(y) => match config {
                ModelConfig::Linear(p) => {
                    let mut m = Ridge::new(p.alpha);
                    m.fit(x, y)?;
                    Ok(FittedModel::Ridge(m))
                }
                ModelConfig::Knn(p) => {
                    let mut m = KnnRegressor::new(p.k);
                    m.fit(x, y)?;
                    Ok(FittedModel::KnnRegressor(m))
                }
                ModelConfig::Baseline => {
                    let mut m = MeanRegressor::new();
                    m.fit(x, y)?;
                    Ok(FittedModel::Mean(m))
                }
                ModelConfig::Logistic(_) => Err(mismatch("regression", config)),
            },
            Target::Classes { labels, n_classes } => match config {
                ModelConfig::Logistic(p) => {
                    let mut m = SoftmaxClassifier::new(p.clone());
                    m.fit(x, labels, *n_classes)?;
                    Ok(FittedModel::Softmax(m))
                }
                ModelConfig::Knn(p) => {
                    let mut m = KnnClassifier::new(p.k);
                    m.fit(x, labels, *n_classes)?;
                    Ok(FittedModel::KnnClassifier(m))
                }
                ModelConfig::Baseline => {
                    let mut m = PriorClassifier::new();
                    m.fit(x, labels, *n_classes)?;
                    Ok(FittedModel::Prior(m))
                }
                ModelConfig::Linear(_) => Err(mismatch("classification", config)),
            },
        }
    }

    fn regressor(&self) -> Option<&dyn Regressor> {
        match self {
            FittedModel::Ridge(m) => Some(m),
            FittedModel::Mean(m) => Some(m),
            FittedModel::KnnRegressor(m) => Some(m),
            _ => None,
        }
    }

    fn classifier(&self) -> Option<&dyn Classifier> {
        match self {
            FittedModel::Softmax(m) => Some(m),
            FittedModel::Prior(m) => Some(m),
            FittedModel::KnnClassifier(m) => Some(m),
            _ => None,
        }
    }

    /// Continuous predictions; fails for classifiers.
    pub fn predict(&self, x: &Matrix) -> Result<Vec<f64>, LearnError> {
        self.regressor()
            .ok_or_else(|| LearnError::ProblemTypeMismatch {
                requested: "regression".into(),
                actual: "classification".into(),
            })?
            .predict(x)
    }

    /// Class probabilities; fails for regressors.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Matrix, LearnError> {
        self.classifier()
            .ok_or_else(|| LearnError::ProblemTypeMismatch {
                requested: "classification".into(),
                actual: "regression".into(),
            })?
            .predict_proba(x)
    }

    fn score(&self, x: &Matrix, target: &Target) -> Result<f64, LearnError> {
        let score = match target {
            Target::Continuous(y) => metrics::r2(y, &self.predict(x)?),
            Target::Classes { labels, .. } => -metrics::log_loss(labels, &self.predict_proba(x)?),
        };
        Ok(if score.is_nan() { f64::NEG_INFINITY } else { score })
    }
}

/// Holdout score of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub config: ModelConfig,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedTabular {
    features: FeatureGenerator,
    model: FittedModel,
    best: ModelConfig,
    leaderboard: Vec<LeaderboardEntry>,
    n_classes: usize,
}

/// Feature generation plus model selection for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularPredictor {
    problem_type: ProblemType,
    config: TabularConfig,
    state: Option<FittedTabular>,
}

impl TabularPredictor {
    pub fn new(problem_type: ProblemType, config: TabularConfig) -> Self {
        Self {
            problem_type,
            config,
            state: None,
        }
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    pub fn config(&self) -> &TabularConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn fit_regression(&mut self, frame: &Frame, y: &[f64]) -> Result<(), LearnError> {
        self.require(false)?;
        check_length(frame, y.len())?;
        self.fit_target(frame, Target::Continuous(y.to_vec()))
    }

    pub fn fit_classification(
        &mut self,
        frame: &Frame,
        labels: &[usize],
        n_classes: usize,
    ) -> Result<(), LearnError> {
        self.require(true)?;
        check_length(frame, labels.len())?;
        self.fit_target(
            frame,
            Target::Classes {
                labels: labels.to_vec(),
                n_classes,
            },
        )
    }

    fn require(&self, classification: bool) -> Result<(), LearnError> {
        if self.problem_type.is_classification() != classification {
            return Err(LearnError::ProblemTypeMismatch {
                requested: if classification { "classification" } else { "regression" }.into(),
                actual: self.problem_type.to_string(),
            });
        }
        Ok(())
    }

    fn fit_target(&mut self, frame: &Frame, target: Target) -> Result<(), LearnError> {
        let n = frame.n_rows();
        if n == 0 {
            return Err(LearnError::EmptyTrainingSet);
        }
        if self.config.num_gpus > 0 {
            warn!(num_gpus = self.config.num_gpus, "GPU requested; training on CPU");
        }
        let candidates = self.config.candidates(self.problem_type)?;
        let (features, x) = FeatureGenerator::fit_transform(frame, &self.config.features)?;

        let leaderboard = if candidates.len() > 1 {
            self.rank(&candidates, &x, &target)?
        } else {
            Vec::new()
        };
        let best = leaderboard
            .first()
            .map(|e| e.config.clone())
            .unwrap_or_else(|| candidates[0].clone());
        let model = FittedModel::train(&best, &x, &target)?;
        info!(
            problem_type = %self.problem_type,
            rows = n,
            features = x.cols(),
            best = %best.family(),
            "tabular predictor fitted"
        );
        let n_classes = match target {
            Target::Classes { n_classes, .. } => n_classes,
            Target::Continuous(_) => 0,
        };
        self.state = Some(FittedTabular {
            features,
            model,
            best,
            leaderboard,
            n_classes,
        });
        Ok(())
    }

    /// Score every candidate on the holdout, best first. Ties keep
    /// candidate order.
    fn rank(
        &self,
        candidates: &[ModelConfig],
        x: &Matrix,
        target: &Target,
    ) -> Result<Vec<LeaderboardEntry>, LearnError> {
        let n = x.rows();
        let (train, test) = if n >= MIN_HOLDOUT_ROWS {
            let frac = self.config.holdout_frac.unwrap_or(DEFAULT_HOLDOUT_FRAC);
            if frac.is_nan() || frac <= 0.0 || frac >= 1.0 {
                return Err(LearnError::InvalidHyperparameter {
                    name: "holdout_frac".into(),
                    reason: format!("must lie in (0, 1), got {}", frac),
                });
            }
            train_test_split(n, frac, self.config.seed)
        } else {
            ((0..n).collect(), (0..n).collect())
        };
        let (x_train, t_train) = (x.select_rows(&train), target.select(&train));
        let (x_test, t_test) = (x.select_rows(&test), target.select(&test));

        let mut entries = Vec::with_capacity(candidates.len());
        let mut last_error = None;
        for config in candidates {
            let scored = FittedModel::train(config, &x_train, &t_train)
                .and_then(|m| m.score(&x_test, &t_test));
            match scored {
                Ok(score) => {
                    debug!(family = %config.family(), score, "candidate scored");
                    entries.push(LeaderboardEntry {
                        config: config.clone(),
                        score,
                    });
                }
                Err(e) => {
                    warn!(family = %config.family(), error = %e, "candidate failed");
                    last_error = Some(e);
                }
            }
        }
        if entries.is_empty() {
            return Err(last_error.unwrap_or_else(|| LearnError::NoCandidates {
                problem_type: self.problem_type.to_string(),
            }));
        }
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(entries)
    }

    fn state(&self) -> Result<&FittedTabular, LearnError> {
        self.state.as_ref().ok_or_else(|| LearnError::NotFitted {
            model: "tabular predictor".into(),
        })
    }

    /// Continuous predictions for a regression predictor.
    pub fn predict(&self, frame: &Frame) -> Result<Vec<f64>, LearnError> {
        let state = self.state()?;
        self.require(false)?;
        state.model.predict(&state.features.transform(frame)?)
    }

    /// Class probabilities, one column per class.
    pub fn predict_proba(&self, frame: &Frame) -> Result<Matrix, LearnError> {
        let state = self.state()?;
        self.require(true)?;
        state.model.predict_proba(&state.features.transform(frame)?)
    }

    /// Most probable class per row.
    pub fn predict_classes(&self, frame: &Frame) -> Result<Vec<usize>, LearnError> {
        let proba = self.predict_proba(frame)?;
        Ok((0..proba.rows()).map(|i| argmax(proba.row(i))).collect())
    }

    /// Holdout scores, best first. Empty when only one candidate was tried.
    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        self.state
            .as_ref()
            .map(|s| s.leaderboard.as_slice())
            .unwrap_or(&[])
    }

    pub fn best_model(&self) -> Option<&ModelConfig> {
        self.state.as_ref().map(|s| &s.best)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.state
            .as_ref()
            .map(|s| s.features.feature_names())
            .unwrap_or_default()
    }

    pub fn n_classes(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.n_classes)
    }
}

fn check_length(frame: &Frame, got: usize) -> Result<(), LearnError> {
    if frame.n_rows() != got {
        return Err(CoreError::LengthMismatch {
            name: "target".into(),
            expected: frame.n_rows(),
            got,
        }
        .into());
    }
    Ok(())
}
