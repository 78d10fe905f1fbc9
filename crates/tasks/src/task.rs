//! # Task Envelope
//!
//! Every task returns the same serializable envelope:
//!
//! ```json
//! {
//!   "status": "SUCCESS",
//!   "messenger": "",
//!   "runtime": 0.42,
//!   "data": { ... },
//!   "validations": [{"name": "...", "level": "WARNING", "message": "..."}]
//! }
//! ```
//!
//! A task whose input fails a critical check returns `FAILURE` with the
//! validations and no data. Errors are reserved for misuse and for
//! failures inside the learners.

use std::fmt;
use std::time::Instant;

use causeway_core::{Diagnostic, Diagnostics};
use serde::{Deserialize, Serialize};

/// Every task kind the platform knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    CausalInference,
    Classification,
    ClassificationTrain,
    Clustering,
    DecAnchorClustering,
    Correlation,
    DataImputation,
    Forecast,
    Regression,
    RegressionTrain,
    BayesianRegression,
    SentimentAnalysis,
    Intervention,
    AssociationRules,
}

impl TaskType {
    pub const ALL: [TaskType; 14] = [
        TaskType::CausalInference,
        TaskType::Classification,
        TaskType::ClassificationTrain,
        TaskType::Clustering,
        TaskType::DecAnchorClustering,
        TaskType::Correlation,
        TaskType::DataImputation,
        TaskType::Forecast,
        TaskType::Regression,
        TaskType::RegressionTrain,
        TaskType::BayesianRegression,
        TaskType::SentimentAnalysis,
        TaskType::Intervention,
        TaskType::AssociationRules,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::CausalInference => "causal_inference",
            TaskType::Classification => "classification",
            TaskType::ClassificationTrain => "classification_train",
            TaskType::Clustering => "clustering",
            TaskType::DecAnchorClustering => "dec_anchor_clustering",
            TaskType::Correlation => "correlation",
            TaskType::DataImputation => "data_imputation",
            TaskType::Forecast => "forecast",
            TaskType::Regression => "regression",
            TaskType::RegressionTrain => "regression_train",
            TaskType::BayesianRegression => "bayesian_regression",
            TaskType::SentimentAnalysis => "sentiment_analysis",
            TaskType::Intervention => "intervention",
            TaskType::AssociationRules => "association_rules",
        }
    }

    pub fn from_name(name: &str) -> Option<TaskType> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Success,
    Failure,
}

/// Outcome of one task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult<T> {
    pub status: TaskStatus,
    pub messenger: String,
    /// Wall-clock seconds.
    pub runtime: f64,
    pub data: Option<T>,
    pub validations: Vec<Diagnostic>,
}

impl<T> TaskResult<T> {
    pub fn success(data: T, validations: Diagnostics, started: Instant) -> Self {
        Self {
            status: TaskStatus::Success,
            messenger: String::new(),
            runtime: started.elapsed().as_secs_f64(),
            data: Some(data),
            validations: validations.into_vec(),
        }
    }

    pub fn failure(validations: Diagnostics, started: Instant) -> Self {
        Self {
            status: TaskStatus::Failure,
            messenger: String::new(),
            runtime: started.elapsed().as_secs_f64(),
            data: None,
            validations: validations.into_vec(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_names_roundtrip() {
        for t in TaskType::ALL {
            assert_eq!(TaskType::from_name(t.as_str()), Some(t));
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t));
        }
        assert_eq!(TaskType::from_name("nope"), None);
    }

    #[test]
    fn test_failure_envelope() {
        let mut d = Diagnostics::new();
        d.critical("target", "missing");
        let r: TaskResult<()> = TaskResult::failure(d, Instant::now());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "FAILURE");
        assert_eq!(json["data"], serde_json::Value::Null);
        assert_eq!(json["validations"][0]["level"], "CRITICAL");
    }
}
