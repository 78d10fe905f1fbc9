//! # Model Registry
//!
//! The model families the selector can try, which problem types each one
//! handles, and how user hyperparameters become candidate configurations.
//!
//! Hyperparameters are a JSON object keyed by family name. A value is one
//! parameter object, or a list of them to try several configurations of
//! the same family:
//!
//! ```rust
//! use causeway_learn::registry::{hyperparameters_to_candidates, ModelConfig};
//!
//! let hp = serde_json::json!({
//!     "linear": [{"alpha": 0.1}, {"alpha": 10.0}],
//!     "knn": {"k": 3},
//! });
//! let candidates = hyperparameters_to_candidates(&hp).unwrap();
//! assert_eq!(candidates.len(), 3);
//! assert!(candidates.iter().any(|c| matches!(c, ModelConfig::Knn(p) if p.k == 3)));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::LearnError;
use crate::softmax::SoftmaxParams;

/// What a predictor is asked to learn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    Regression,
    Binary,
    Multiclass,
}

impl ProblemType {
    pub fn is_classification(self) -> bool {
        !matches!(self, ProblemType::Regression)
    }

    /// Binary for two classes, multiclass otherwise.
    pub fn for_classes(n_classes: usize) -> Self {
        if n_classes == 2 {
            ProblemType::Binary
        } else {
            ProblemType::Multiclass
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProblemType::Regression => "regression",
            ProblemType::Binary => "binary",
            ProblemType::Multiclass => "multiclass",
        };
        write!(f, "{}", s)
    }
}

/// Search effort. Higher presets try more configurations per family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presets {
    #[default]
    #[serde(alias = "medium_quality_faster_train")]
    MediumQuality,
    HighQuality,
    BestQuality,
}

/// A learner family known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Ridge regression.
    Linear,
    /// Multinomial logistic regression.
    Logistic,
    Knn,
    /// Training mean or class priors.
    Baseline,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::Linear,
        ModelFamily::Logistic,
        ModelFamily::Knn,
        ModelFamily::Baseline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::Linear => "linear",
            ModelFamily::Logistic => "logistic",
            ModelFamily::Knn => "knn",
            ModelFamily::Baseline => "baseline",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, LearnError> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| LearnError::UnknownModel {
                name: name.to_string(),
            })
    }

    pub fn supports(self, problem_type: ProblemType) -> bool {
        match self {
            ModelFamily::Linear => problem_type == ProblemType::Regression,
            ModelFamily::Logistic => problem_type.is_classification(),
            ModelFamily::Knn | ModelFamily::Baseline => true,
        }
    }

    /// Whether per-row explanations can be produced for this family.
    pub fn explain_samples_supported(self) -> bool {
        !matches!(self, ModelFamily::Knn)
    }

    fn parse(self, params: &Json) -> Result<ModelConfig, LearnError> {
        Ok(match self {
            ModelFamily::Linear => ModelConfig::Linear(serde_json::from_value(params.clone())?),
            ModelFamily::Logistic => ModelConfig::Logistic(serde_json::from_value(params.clone())?),
            ModelFamily::Knn => ModelConfig::Knn(serde_json::from_value(params.clone())?),
            ModelFamily::Baseline => ModelConfig::Baseline,
        })
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    /// L2 penalty.
    pub alpha: f64,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnParams {
    pub k: usize,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self { k: 5 }
    }
}

/// One candidate: a family with its hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelConfig {
    Linear(LinearParams),
    Logistic(SoftmaxParams),
    Knn(KnnParams),
    Baseline,
}

impl ModelConfig {
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelConfig::Linear(_) => ModelFamily::Linear,
            ModelConfig::Logistic(_) => ModelFamily::Logistic,
            ModelConfig::Knn(_) => ModelFamily::Knn,
            ModelConfig::Baseline => ModelFamily::Baseline,
        }
    }
}

/// Families usable for `problem_type`; with `explain_samples`, only those
/// that support per-row explanations.
pub fn available_models(problem_type: ProblemType, explain_samples: bool) -> Vec<ModelFamily> {
    ModelFamily::ALL
        .into_iter()
        .filter(|f| f.supports(problem_type))
        .filter(|f| !explain_samples || f.explain_samples_supported())
        .collect()
}

/// Convert a hyperparameter object into candidate configurations.
pub fn hyperparameters_to_candidates(hyperparameters: &Json) -> Result<Vec<ModelConfig>, LearnError> {
    let object = hyperparameters
        .as_object()
        .ok_or_else(|| LearnError::Config("hyperparameters must be an object".into()))?;
    let mut candidates = Vec::new();
    for (name, value) in object {
        let family = ModelFamily::from_name(name)?;
        match value {
            Json::Array(items) => {
                for item in items {
                    candidates.push(family.parse(item)?);
                }
            }
            Json::Object(_) => candidates.push(family.parse(value)?),
            other => {
                return Err(LearnError::Config(format!(
                    "parameters for {} must be an object or a list, got {}",
                    name, other
                )))
            }
        }
    }
    Ok(candidates)
}

/// Built-in candidates for a problem type and search effort.
pub fn default_candidates(problem_type: ProblemType, presets: Presets) -> Vec<ModelConfig> {
    let mut out = vec![ModelConfig::Baseline];
    let ks: &[usize] = match presets {
        Presets::MediumQuality => &[5],
        Presets::HighQuality => &[5, 15],
        Presets::BestQuality => &[3, 5, 15, 30],
    };
    if problem_type.is_classification() {
        let l2s: &[f64] = match presets {
            Presets::MediumQuality => &[1e-4],
            Presets::HighQuality => &[1e-4, 1e-2],
            Presets::BestQuality => &[1e-5, 1e-4, 1e-3, 1e-2],
        };
        out.extend(l2s.iter().map(|&l2| {
            ModelConfig::Logistic(SoftmaxParams {
                l2,
                ..SoftmaxParams::default()
            })
        }));
    } else {
        let alphas: &[f64] = match presets {
            Presets::MediumQuality => &[1.0],
            Presets::HighQuality => &[0.1, 1.0, 10.0],
            Presets::BestQuality => &[0.01, 0.1, 1.0, 10.0, 100.0],
        };
        out.extend(alphas.iter().map(|&alpha| ModelConfig::Linear(LinearParams { alpha })));
    }
    out.extend(ks.iter().map(|&k| ModelConfig::Knn(KnnParams { k })));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_available_models_by_problem_type() {
        let reg = available_models(ProblemType::Regression, false);
        assert!(reg.contains(&ModelFamily::Linear));
        assert!(!reg.contains(&ModelFamily::Logistic));
        let cls = available_models(ProblemType::Multiclass, true);
        assert_eq!(cls, vec![ModelFamily::Logistic, ModelFamily::Baseline]);
    }

    #[test]
    fn test_unknown_family_rejected() {
        let err = hyperparameters_to_candidates(&json!({"xgboost": {}})).unwrap_err();
        assert_eq!(
            err,
            LearnError::UnknownModel {
                name: "xgboost".into()
            }
        );
    }

    #[test]
    fn test_defaults_fill_missing_params() {
        let c = hyperparameters_to_candidates(&json!({"logistic": {"epochs": 5}})).unwrap();
        match &c[0] {
            ModelConfig::Logistic(p) => {
                assert_eq!(p.epochs, 5);
                assert_eq!(p.batch_size, SoftmaxParams::default().batch_size);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            hyperparameters_to_candidates(&json!({"knn": 3})),
            Err(LearnError::Config(_))
        ));
        assert!(matches!(
            hyperparameters_to_candidates(&json!([1, 2])),
            Err(LearnError::Config(_))
        ));
    }

    #[test]
    fn test_presets_grow_candidates() {
        let medium = default_candidates(ProblemType::Regression, Presets::MediumQuality);
        let best = default_candidates(ProblemType::Regression, Presets::BestQuality);
        assert!(best.len() > medium.len());
        assert!(medium
            .iter()
            .all(|c| c.family().supports(ProblemType::Regression)));
    }

    #[test]
    fn test_presets_alias() {
        let p: Presets = serde_json::from_value(json!("medium_quality_faster_train")).unwrap();
        assert_eq!(p, Presets::MediumQuality);
    }

    #[test]
    fn test_config_json_shape() {
        let v = serde_json::to_value(ModelConfig::Knn(KnnParams { k: 7 })).unwrap();
        assert_eq!(v, json!({"family": "knn", "k": 7}));
    }
}
