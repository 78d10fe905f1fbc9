//! # Intervention Effect Predictor
//!
//! Fits a double machine learning model of how the target responds to a
//! treatment column, then predicts every row's outcome had its treatment
//! been the value in a second column.
//!
//! ```text
//! fit(frame)            predict_effect(frame)
//!   │                     │
//!   ├─ check_params       ├─ check columns again
//!   ├─ encode target      ├─ encode target (fitted encoder)
//!   ├─ build nuisances    ├─ effect(X, T0, T1)
//!   ├─ build estimator    ├─ intervened = decode(Y + effect)
//!   └─ fit, persist       └─ bounds when cate_alpha is set
//! ```
//!
//! Conflicting options are reported as [`Diagnostics`] on the
//! [`FitReport`] instead of failing: a numeric target ignores supplied
//! probabilities and a categorical target ignores `cate_alpha`.
//!
//! ## Example
//!
//! ```rust
//! use causeway_core::{Column, Frame};
//! use causeway_causal::{InterventionConfig, InterventionEffectPredictor};
//!
//! let n = 40;
//! let dose: Vec<f64> = (0..n).map(|i| (i % 5) as f64).collect();
//! let new_dose: Vec<f64> = dose.iter().map(|d| d + 1.0).collect();
//! let response: Vec<f64> = dose.iter().map(|d| 3.0 * d + 1.0).collect();
//! let frame = Frame::new(vec![
//!     Column::float("dose", dose),
//!     Column::float("new_dose", new_dose),
//!     Column::float("response", response),
//! ])
//! .unwrap();
//!
//! let mut predictor = InterventionEffectPredictor::new(InterventionConfig::new(
//!     "response", "dose", "new_dose",
//! ));
//! predictor.fit(&frame, None).unwrap();
//! let table = predictor.predict_effect(&frame, None).unwrap();
//! assert_eq!(table.len(), n);
//! assert!((table.effect.get(0, 0) - 3.0).abs() < 0.1);
//! ```

use std::path::{Path, PathBuf};

use causeway_core::{Column, ColumnKind, Diagnostics, Frame, Matrix, Severity};
use causeway_learn::{FeatureGeneratorConfig, Presets};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::{debug, info, warn};

use crate::artifact;
use crate::dml::{self, CausalEstimator, DmlSettings, EstimatorKind, LinearDml, NonParamDml};
use crate::encoder::{Decoded, OutcomeEncoder};
use crate::error::CausalError;
use crate::nuisance::{NuisanceConfig, NuisanceFactory};
use crate::versioned::{InterventionalModel, VersionedModel};

/// Options of an [`InterventionEffectPredictor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionConfig {
    pub target: String,
    /// Treatment as observed.
    pub current_intervention_column: String,
    /// Treatment to predict under.
    pub new_intervention_column: String,
    /// Confounders. Empty means no adjustment.
    pub common_causes: Vec<String>,
    /// Cross-fitting folds; `1` fits the nuisances on every row.
    pub causal_cv: usize,
    /// Nuisance model candidates keyed by family name.
    pub causal_hyperparameters: Option<Json>,
    /// Significance level of effect intervals, e.g. `0.05`.
    pub cate_alpha: Option<f64>,
    pub presets: Presets,
    /// Where fitted models are written; nothing is written when unset.
    pub model_directory: Option<PathBuf>,
    pub num_gpus: usize,
    pub drop_unique: bool,
    pub drop_useless_features: bool,
    pub feature_generator: FeatureGeneratorConfig,
    pub seed: u64,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            current_intervention_column: String::new(),
            new_intervention_column: String::new(),
            common_causes: Vec::new(),
            causal_cv: 1,
            causal_hyperparameters: None,
            cate_alpha: None,
            presets: Presets::default(),
            model_directory: None,
            num_gpus: 0,
            drop_unique: true,
            drop_useless_features: true,
            feature_generator: FeatureGeneratorConfig::default(),
            seed: 0,
        }
    }
}

impl InterventionConfig {
    pub fn new(
        target: impl Into<String>,
        current_intervention_column: impl Into<String>,
        new_intervention_column: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            current_intervention_column: current_intervention_column.into(),
            new_intervention_column: new_intervention_column.into(),
            ..Self::default()
        }
    }

    pub fn with_common_causes<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.common_causes = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cate_alpha(mut self, alpha: f64) -> Self {
        self.cate_alpha = Some(alpha);
        self
    }

    fn features(&self) -> FeatureGeneratorConfig {
        FeatureGeneratorConfig {
            drop_unique: self.drop_unique,
            drop_useless: self.drop_useless_features,
            ..self.feature_generator.clone()
        }
    }

    fn nuisance(&self) -> NuisanceConfig {
        NuisanceConfig {
            hyperparameters: self.causal_hyperparameters.clone(),
            presets: self.presets,
            features: self.features(),
            num_gpus: self.num_gpus,
            seed: self.seed,
        }
    }

    fn has_confounders(&self) -> bool {
        !self.common_causes.is_empty()
    }
}

/// What a successful `fit` produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub kind: EstimatorKind,
    /// Warnings raised while resolving options.
    pub diagnostics: Diagnostics,
    /// Directory the fitted model was written to.
    pub artifact: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedIntervention {
    outcome: OutcomeEncoder,
    estimator: CausalEstimator,
    target_kind: ColumnKind,
    treatment_kind: ColumnKind,
    /// `cate_alpha` after conflicts were resolved.
    alpha: Option<f64>,
}

/// Interval columns of an [`EffectTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalBounds {
    pub effect_low: Vec<f64>,
    pub effect_high: Vec<f64>,
    /// Missing where the baseline target is missing.
    pub intervened_low: Vec<Option<f64>>,
    pub intervened_high: Vec<Option<f64>>,
}

/// Per-row result of [`InterventionEffectPredictor::predict_effect`], in
/// input row order.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectTable {
    pub intervened: Decoded,
    /// Effect in encoded space, one column per encoded outcome column.
    pub effect: Matrix,
    /// Class names of a categorical target, in effect column order.
    pub classes: Vec<String>,
    pub bounds: Option<IntervalBounds>,
}

impl EffectTable {
    pub fn len(&self) -> usize {
        self.effect.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render as named columns: `<target>_intervened`, the effect, then the
    /// bounds when present.
    pub fn to_frame(&self, target: &str) -> Result<Frame, CausalError> {
        let mut columns = Vec::new();
        let intervened = format!("{}_intervened", target);
        columns.push(match &self.intervened {
            Decoded::Numeric(values) => Column::float_opt(intervened, values.clone()),
            Decoded::Labels(labels) => Column::text_opt(intervened, labels.clone()),
        });
        if self.effect.cols() == 1 {
            columns.push(Column::float("intervention_effect", self.effect.column(0)));
        } else {
            for (j, class) in self.classes.iter().enumerate() {
                columns.push(Column::float(
                    format!("intervention_effect_{}", class),
                    self.effect.column(j),
                ));
            }
        }
        if let Some(b) = &self.bounds {
            columns.push(Column::float_opt(format!("{}_intervened_low", target), b.intervened_low.clone()));
            columns.push(Column::float_opt(format!("{}_intervened_high", target), b.intervened_high.clone()));
            columns.push(Column::float("intervention_effect_low", b.effect_low.clone()));
            columns.push(Column::float("intervention_effect_high", b.effect_high.clone()));
        }
        Ok(Frame::from_parts(self.len(), columns)?)
    }
}

/// Causal model of one target and one treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionEffectPredictor {
    config: InterventionConfig,
    state: Option<FittedIntervention>,
}

impl InterventionEffectPredictor {
    pub fn new(config: InterventionConfig) -> Self {
        Self { config, state: None }
    }

    /// Restore a predictor written by a fit with `model_directory` set.
    /// Artifacts from another deployment version are rejected.
    pub fn load(artifact_dir: &Path) -> Result<Self, CausalError> {
        artifact::load::<InterventionalModel>(artifact_dir)?.into_current()
    }

    pub fn config(&self) -> &InterventionConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Kind of the fitted estimator.
    pub fn estimator_kind(&self) -> Option<EstimatorKind> {
        self.state.as_ref().map(|s| s.estimator.kind())
    }

    /// Median/mode imputation of every column.
    pub fn preprocess_data(&self, frame: &Frame) -> Result<Frame, CausalError> {
        Ok(causeway_prep::impute_median_mode(frame)?)
    }

    /// Every problem `fit` would find with these inputs, without fitting.
    pub fn check_params(&self, frame: &Frame, target_proba: Option<&Matrix>) -> Diagnostics {
        let mut d = self.check_columns(frame);
        if d.has_critical() {
            return d;
        }
        let c = &self.config;
        let n = frame.n_rows();
        let (Ok(target), Ok(t0), Ok(t1)) = (
            frame.column(&c.target),
            frame.column(&c.current_intervention_column),
            frame.column(&c.new_intervention_column),
        ) else {
            return d;
        };

        if t0.kind().is_category() {
            let known = t0.distinct_labels();
            let unseen: Vec<String> = t1
                .distinct_labels()
                .into_iter()
                .filter(|l| known.binary_search(l).is_err())
                .collect();
            if !unseen.is_empty() {
                d.critical(
                    "unknown_treatment_levels",
                    format!(
                        "{} holds levels never seen in {}: {:?}",
                        c.new_intervention_column, c.current_intervention_column, unseen
                    ),
                );
            }
        }
        if target.kind().is_numeric() && target.null_count() > 0 {
            d.critical(
                "target_missing_values",
                format!("{} has {} missing values", c.target, target.null_count()),
            );
        }
        if n < 2 {
            d.critical("too_few_rows", format!("{} rows, need at least 2", n));
        }
        if c.causal_cv > 1 && c.causal_cv > n {
            d.critical(
                "causal_cv",
                format!("causal_cv = {} exceeds the {} rows", c.causal_cv, n),
            );
        }
        if let Some(alpha) = c.cate_alpha {
            if alpha.is_nan() || alpha <= 0.0 || alpha >= 1.0 {
                d.critical("invalid_cate_alpha", format!("cate_alpha must lie in (0, 1), got {}", alpha));
            }
        }

        if target.kind().is_numeric() && target_proba.is_some() {
            d.warn(
                "target_proba_ignored",
                format!("{} is numeric, target_proba will be ignored", c.target),
            );
        }
        if target.kind().is_category() && c.cate_alpha.is_some() {
            d.warn(
                "cate_alpha_ignored",
                format!("{} is categorical, cate_alpha will be ignored", c.target),
            );
        }
        if c.num_gpus > 0 {
            d.warn(
                "gpu_unavailable",
                format!("{} GPUs requested, nuisance models train on CPU", c.num_gpus),
            );
        }
        d
    }

    /// Column references and treatment kinds only; no check looks at cell
    /// values. Shared by fit and predict.
    pub fn check_columns(&self, frame: &Frame) -> Diagnostics {
        let c = &self.config;
        let mut d = Diagnostics::new();
        let mut referenced = vec![
            c.target.as_str(),
            c.current_intervention_column.as_str(),
            c.new_intervention_column.as_str(),
        ];
        referenced.extend(c.common_causes.iter().map(String::as_str));
        let missing = frame.missing_columns(&referenced);
        if !missing.is_empty() {
            d.critical("missing_columns", format!("columns not found: {:?}", missing));
            return d;
        }
        let overlapping: Vec<&str> = referenced
            .iter()
            .enumerate()
            .filter(|&(i, name)| referenced[..i].contains(name))
            .map(|(_, name)| *name)
            .collect();
        if !overlapping.is_empty() {
            d.critical(
                "overlapping_columns",
                format!("target, treatment and common causes must be distinct: {:?}", overlapping),
            );
        }
        let (Ok(t0), Ok(t1)) = (
            frame.column(&c.current_intervention_column),
            frame.column(&c.new_intervention_column),
        ) else {
            return d;
        };
        if t0.kind().is_numeric() != t1.kind().is_numeric() {
            d.critical(
                "treatment_kind_mismatch",
                format!(
                    "{} is {} but {} is {}",
                    c.current_intervention_column,
                    t0.kind(),
                    c.new_intervention_column,
                    t1.kind()
                ),
            );
        }
        d
    }

    fn fail_on_critical(diagnostics: &Diagnostics) -> Result<(), CausalError> {
        if !diagnostics.has_critical() {
            return Ok(());
        }
        let messages: Vec<String> = diagnostics
            .iter()
            .filter(|d| d.level == Severity::Critical)
            .map(|d| d.message.clone())
            .collect();
        Err(CausalError::Validation(messages.join("; ")))
    }

    /// Fit a fresh estimator; any previous fit is discarded.
    pub fn fit(&mut self, frame: &Frame, target_proba: Option<&Matrix>) -> Result<FitReport, CausalError> {
        let diagnostics = self.check_params(frame, target_proba);
        Self::fail_on_critical(&diagnostics)?;
        for w in diagnostics.warnings() {
            warn!(check = %w.name, "{}", w.message);
        }

        let c = &self.config;
        let target = frame.column(&c.target)?;
        let t0 = frame.column(&c.current_intervention_column)?;
        let x = frame.select(c.common_causes.as_slice())?;
        let target_kind = target.kind();
        let proba = if target_kind.is_numeric() { None } else { target_proba };
        let alpha = if target_kind.is_numeric() { c.cate_alpha } else { None };

        let (outcome, y) = OutcomeEncoder::fit(target, proba)?;
        let factory = NuisanceFactory::new(c.nuisance());
        let model_t = factory.build_treatment_model(&x, t0);
        let model_y = factory.build_outcome_model(&y);
        let kind = dml::build(t0.kind(), t0.n_unique(), c.has_confounders(), alpha.is_some());
        let settings = DmlSettings {
            cv: c.causal_cv,
            discrete_treatment: t0.kind().is_category(),
            // The final stage adds its own intercept.
            featurizer: c.has_confounders().then(|| FeatureGeneratorConfig {
                drop_first: true,
                ..c.features()
            }),
            seed: c.seed,
        };
        info!(
            target = %c.target,
            treatment = %c.current_intervention_column,
            estimator = %kind,
            rows = frame.n_rows(),
            outcomes = y.cols(),
            "fitting intervention model"
        );
        let mut estimator = match kind {
            EstimatorKind::Linear => CausalEstimator::Linear(LinearDml::new(model_t, model_y, settings)),
            EstimatorKind::NonParametric => CausalEstimator::NonParametric(NonParamDml::new(
                model_t,
                model_y,
                factory.build_final_models(&y),
                settings,
            )),
        };
        self.state = None;
        estimator.fit(&y, t0, &x)?;
        self.state = Some(FittedIntervention {
            outcome,
            estimator,
            target_kind,
            treatment_kind: t0.kind(),
            alpha,
        });

        let artifact = match &self.config.model_directory {
            Some(dir) => Some(artifact::persist(dir, &VersionedModel::new(&*self))?),
            None => None,
        };
        Ok(FitReport {
            kind,
            diagnostics,
            artifact,
        })
    }

    /// Outcome of every row under its new treatment value.
    pub fn predict_effect(
        &self,
        frame: &Frame,
        target_proba: Option<&Matrix>,
    ) -> Result<EffectTable, CausalError> {
        let state = self.state.as_ref().ok_or(CausalError::NotFitted)?;
        let c = &self.config;
        Self::fail_on_critical(&self.check_columns(frame))?;
        let target = frame.column(&c.target)?;
        let t0 = frame.column(&c.current_intervention_column)?;
        let t1 = frame.column(&c.new_intervention_column)?;
        check_kind(target, state.target_kind)?;
        check_kind(t0, state.treatment_kind)?;

        let x = frame.select(c.common_causes.as_slice())?;
        let proba = if state.outcome.is_categorical() { target_proba } else { None };
        let y = state.outcome.encode(target, proba)?;
        let effect = state.estimator.effect(&x, t0, t1)?;
        let intervened = state.outcome.decode(&y.add(&effect)?)?;
        debug!(rows = frame.n_rows(), "effects predicted");

        let bounds = match state.alpha {
            Some(alpha) if !state.outcome.is_categorical() => {
                let (low, high) = state.estimator.effect_interval(&x, t0, t1, alpha)?;
                let baseline = y.column(0);
                let shift = |bound: &Matrix| -> Vec<Option<f64>> {
                    baseline
                        .iter()
                        .zip(bound.column(0))
                        .map(|(y, b)| if y.is_nan() { None } else { Some(y + b) })
                        .collect()
                };
                Some(IntervalBounds {
                    intervened_low: shift(&low),
                    intervened_high: shift(&high),
                    effect_low: low.column(0),
                    effect_high: high.column(0),
                })
            }
            _ => None,
        };
        Ok(EffectTable {
            intervened,
            effect,
            classes: state.outcome.classes().to_vec(),
            bounds,
        })
    }
}

fn check_kind(column: &Column, fitted: ColumnKind) -> Result<(), CausalError> {
    if column.kind().is_numeric() != fitted.is_numeric() {
        return Err(CausalError::validation(format!(
            "{} is {} but was {} at fit",
            column.name(),
            column.kind(),
            fitted
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> Frame {
        let t: Vec<f64> = (0..n).map(|i| (i % 4) as f64).collect();
        let t1: Vec<f64> = t.iter().map(|v| v + 1.0).collect();
        let y: Vec<f64> = t.iter().map(|v| 2.0 * v).collect();
        Frame::new(vec![
            Column::float("t", t),
            Column::float("t1", t1),
            Column::float("y", y),
        ])
        .unwrap()
    }

    #[test]
    fn test_missing_columns_are_critical() {
        let p = InterventionEffectPredictor::new(InterventionConfig::new("y", "t", "absent"));
        let d = p.check_params(&frame(10), None);
        assert!(d.has_critical());
        assert!(d.contains("missing_columns"));
    }

    #[test]
    fn test_overlapping_roles_are_critical() {
        let config = InterventionConfig::new("y", "t", "t1").with_common_causes(["t"]);
        let d = InterventionEffectPredictor::new(config).check_params(&frame(10), None);
        assert!(d.contains("overlapping_columns"));
    }

    #[test]
    fn test_conflicts_are_warnings() {
        let config = InterventionConfig {
            num_gpus: 1,
            ..InterventionConfig::new("y", "t", "t1")
        };
        let d = InterventionEffectPredictor::new(config).check_params(&frame(10), Some(&Matrix::zeros(10, 2)));
        assert!(!d.has_critical());
        assert!(d.contains("target_proba_ignored"));
        assert!(d.contains("gpu_unavailable"));
    }

    #[test]
    fn test_categorical_target_ignores_alpha() {
        let mut f = frame(12);
        f.push_column(Column::text("label", (0..12).map(|i| if i % 2 == 0 { "a" } else { "b" })))
            .unwrap();
        let config = InterventionConfig::new("label", "t", "t1").with_cate_alpha(0.1);
        let d = InterventionEffectPredictor::new(config).check_params(&f, None);
        assert!(d.contains("cate_alpha_ignored"));
    }

    #[test]
    fn test_invalid_alpha_is_critical() {
        let config = InterventionConfig::new("y", "t", "t1").with_cate_alpha(1.5);
        let d = InterventionEffectPredictor::new(config).check_params(&frame(10), None);
        assert!(d.contains("invalid_cate_alpha"));
    }

    #[test]
    fn test_fit_rejects_before_training() {
        let mut p = InterventionEffectPredictor::new(InterventionConfig::new("y", "nope", "t1"));
        assert!(matches!(p.fit(&frame(10), None), Err(CausalError::Validation(_))));
        assert!(!p.is_fitted());
    }

    #[test]
    fn test_effect_table_frame_columns() {
        let table = EffectTable {
            intervened: Decoded::Numeric(vec![Some(1.0), None]),
            effect: Matrix::column_vector(vec![0.5, 0.5]),
            classes: Vec::new(),
            bounds: Some(IntervalBounds {
                effect_low: vec![0.0, 0.0],
                effect_high: vec![1.0, 1.0],
                intervened_low: vec![Some(0.5), None],
                intervened_high: vec![Some(1.5), None],
            }),
        };
        let f = table.to_frame("sales").unwrap();
        assert_eq!(
            f.column_names(),
            vec![
                "sales_intervened",
                "intervention_effect",
                "sales_intervened_low",
                "sales_intervened_high",
                "intervention_effect_low",
                "intervention_effect_high",
            ]
        );
        assert_eq!(f.n_rows(), 2);
    }

    #[test]
    fn test_config_from_json() {
        let config: InterventionConfig = serde_json::from_str(
            r#"{"target": "y", "current_intervention_column": "t", "new_intervention_column": "t1", "cate_alpha": 0.05}"#,
        )
        .unwrap();
        assert_eq!(config.causal_cv, 1);
        assert!(config.drop_unique);
        assert_eq!(config.cate_alpha, Some(0.05));
    }
}
