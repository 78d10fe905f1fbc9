//! Forecasting model parameters.
//!
//! Only the constant-value baseline lives here: it forecasts one tuned
//! constant for every step and every target dimension.

use causeway_core::Matrix;
use causeway_learn::tuner::{Param, SearchSpace, TrialConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelName {
    ConstantValue,
    MultivariateConstantValue,
}

/// A float hyperparameter chosen from a closed range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatRangeSpace {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub default: (f64, f64),
}

/// Hyperparameters a forecasting model exposes to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSpace {
    pub name: ModelName,
    pub display_name: String,
    pub parameters: Vec<FloatRangeSpace>,
}

/// What a forecasting model can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub is_multivariate: bool,
    pub has_estimator: bool,
    pub handle_feat_static_real: bool,
    pub handle_feat_static_cat: bool,
    pub handle_feat_dynamic_real: bool,
    pub handle_feat_dynamic_cat: bool,
}

/// User choice for the constant: a fixed number or a range to search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSetting {
    Fixed(f64),
    Range(f64, f64),
}

impl ValueSetting {
    fn parse(json: &Json) -> Result<Self, TaskError> {
        let invalid = || TaskError::parameter("value", format!("expected a number or [low, high], got {}", json));
        match json {
            Json::Number(n) => n.as_f64().map(ValueSetting::Fixed).ok_or_else(invalid),
            Json::Array(items) => match items.as_slice() {
                [low, high] => {
                    let (Some(low), Some(high)) = (low.as_f64(), high.as_f64()) else {
                        return Err(invalid());
                    };
                    if low > high {
                        return Err(TaskError::parameter(
                            "value",
                            format!("range low {} is above high {}", low, high),
                        ));
                    }
                    Ok(ValueSetting::Range(low, high))
                }
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

/// Parameters of the (multivariate) constant-value forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantValueParams {
    multivariate: bool,
    value: ValueSetting,
}

impl ConstantValueParams {
    const VALUE: &'static str = "value";

    pub fn hyperparameters(multivariate: bool) -> HyperparameterSpace {
        let (name, display_name) = if multivariate {
            (ModelName::MultivariateConstantValue, "Multivariate Constant Value Predictor")
        } else {
            (ModelName::ConstantValue, "Constant Value Predictor")
        };
        HyperparameterSpace {
            name,
            display_name: display_name.to_string(),
            parameters: vec![FloatRangeSpace {
                name: Self::VALUE.to_string(),
                display_name: "Value".to_string(),
                description: "Constant value used for prediction.".to_string(),
                default: (0.0, 100.0),
            }],
        }
    }

    /// Parse user hyperparameters such as `{"value": 3}` or
    /// `{"value": [0, 10]}`. `None` searches the default range.
    pub fn new(hyperparameters: Option<&Json>) -> Result<Self, TaskError> {
        Self::parse(hyperparameters, false)
    }

    pub fn multivariate(hyperparameters: Option<&Json>) -> Result<Self, TaskError> {
        Self::parse(hyperparameters, true)
    }

    fn parse(hyperparameters: Option<&Json>, multivariate: bool) -> Result<Self, TaskError> {
        let (low, high) = Self::hyperparameters(multivariate).parameters[0].default;
        let mut value = ValueSetting::Range(low, high);
        match hyperparameters {
            None | Some(Json::Null) => {}
            Some(Json::Object(map)) => {
                for (key, v) in map {
                    if key != Self::VALUE {
                        return Err(TaskError::parameter(key.as_str(), "unknown hyperparameter"));
                    }
                    value = ValueSetting::parse(v)?;
                }
            }
            Some(other) => {
                return Err(TaskError::parameter(
                    "hyperparameters",
                    format!("expected an object, got {}", other),
                ))
            }
        }
        Ok(Self { multivariate, value })
    }

    pub fn model_name(&self) -> ModelName {
        Self::hyperparameters(self.multivariate).name
    }

    pub fn value(&self) -> ValueSetting {
        self.value
    }

    pub fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities {
            is_multivariate: self.multivariate,
            has_estimator: false,
            handle_feat_static_real: false,
            handle_feat_static_cat: false,
            handle_feat_dynamic_real: false,
            handle_feat_dynamic_cat: false,
        }
    }

    /// Search space for the tuner. A degenerate range is fixed.
    pub fn tune_config(&self) -> SearchSpace {
        let param = match self.value {
            ValueSetting::Fixed(value) => Param::Fixed { value },
            ValueSetting::Range(low, high) if low == high => Param::Fixed { value: low },
            ValueSetting::Range(low, high) => Param::Uniform { low, high },
        };
        SearchSpace::new().with(Self::VALUE, param)
    }

    pub fn build_predictor(
        &self,
        prediction_length: usize,
        target_dim: usize,
        config: &TrialConfig,
    ) -> Result<ConstantValuePredictor, TaskError> {
        let value = config
            .get(Self::VALUE)
            .copied()
            .ok_or_else(|| TaskError::parameter(Self::VALUE, "missing from the selected configuration"))?;
        if target_dim == 0 || (!self.multivariate && target_dim != 1) {
            return Err(TaskError::parameter(
                "target_dim",
                format!("{} cannot forecast {} targets", self.model_name_str(), target_dim),
            ));
        }
        Ok(ConstantValuePredictor {
            value,
            prediction_length,
            target_dim,
        })
    }

    fn model_name_str(&self) -> &'static str {
        match self.model_name() {
            ModelName::ConstantValue => "constant_value",
            ModelName::MultivariateConstantValue => "multivariate_constant_value",
        }
    }
}

/// Forecasts `value` at every step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantValuePredictor {
    pub value: f64,
    pub prediction_length: usize,
    pub target_dim: usize,
}

impl ConstantValuePredictor {
    /// `prediction_length × target_dim` forecast.
    pub fn predict(&self) -> Matrix {
        Matrix::full(self.prediction_length, self.target_dim, self.value)
    }
}
