//! Intervention task: fit an [`InterventionEffectPredictor`] on a frame
//! and return the frame with the predicted effects appended.

use std::path::PathBuf;
use std::time::Instant;

use causeway_causal::{EstimatorKind, InterventionConfig, InterventionEffectPredictor};
use causeway_core::Frame;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::error::TaskError;
use crate::task::{TaskResult, TaskType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionParams {
    #[serde(flatten)]
    pub config: InterventionConfig,
    /// Fill missing cells by median/mode before fitting.
    pub impute: bool,
}

impl Default for InterventionParams {
    fn default() -> Self {
        Self {
            config: InterventionConfig::default(),
            impute: true,
        }
    }
}

impl From<InterventionConfig> for InterventionParams {
    fn from(config: InterventionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionData {
    pub estimator: EstimatorKind,
    /// Input columns followed by the intervened outcome and effect columns.
    pub table: Frame,
    pub artifact: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InterventionTask;

impl InterventionTask {
    pub const TASK_TYPE: TaskType = TaskType::Intervention;

    pub fn run(&self, frame: &Frame, params: &InterventionParams) -> Result<TaskResult<InterventionData>, TaskError> {
        let started = Instant::now();
        let _span = info_span!("task", kind = %Self::TASK_TYPE).entered();
        let mut predictor = InterventionEffectPredictor::new(params.config.clone());

        // Cell-level checks run after imputation, which may fill them.
        let data = if params.impute {
            let references = predictor.check_columns(frame);
            if references.has_critical() {
                info!(checks = references.len(), "intervention rejected");
                return Ok(TaskResult::failure(references, started));
            }
            predictor.preprocess_data(frame)?
        } else {
            frame.clone()
        };
        let checks = predictor.check_params(&data, None);
        if checks.has_critical() {
            info!(checks = checks.len(), "intervention rejected");
            return Ok(TaskResult::failure(checks, started));
        }

        let report = predictor.fit(&data, None)?;
        let effects = predictor.predict_effect(&data, None)?;
        let mut columns = frame.columns().to_vec();
        columns.extend(effects.to_frame(&params.config.target)?.into_columns());
        let table = frame.with_columns(columns)?;
        info!(estimator = %report.kind, rows = table.n_rows(), "intervention finished");

        Ok(TaskResult::success(
            InterventionData {
                estimator: report.kind,
                table,
                artifact: report.artifact,
            },
            report.diagnostics,
            started,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_core::Column;

    #[test]
    fn test_params_flatten_config() {
        let params: InterventionParams = serde_json::from_str(
            r#"{"target": "y", "current_intervention_column": "t", "new_intervention_column": "t2", "impute": false}"#,
        )
        .unwrap();
        assert_eq!(params.config.target, "y");
        assert_eq!(params.config.causal_cv, 1);
        assert!(!params.impute);
    }

    #[test]
    fn test_missing_columns_give_failure() {
        let frame = Frame::new(vec![Column::float("y", vec![1.0, 2.0, 3.0])]).unwrap();
        let params = InterventionParams::from(InterventionConfig::new("y", "t", "t2"));
        let result = InterventionTask.run(&frame, &params).unwrap();
        assert!(!result.is_success());
        assert!(result.data.is_none());
        assert!(result.validations.iter().any(|v| v.name == "missing_columns"));
    }
}
