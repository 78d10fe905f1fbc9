//! One regression predictor per target column.

use causeway_core::{CoreError, Frame, Matrix};
use serde::{Deserialize, Serialize};

use crate::automl::{TabularConfig, TabularPredictor};
use crate::error::LearnError;
use crate::registry::ProblemType;

/// Fits an independent [`TabularPredictor`] to each column of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiOutputRegressor {
    config: TabularConfig,
    predictors: Vec<TabularPredictor>,
}

impl MultiOutputRegressor {
    pub fn new(config: TabularConfig) -> Self {
        Self {
            config,
            predictors: Vec::new(),
        }
    }

    pub fn fit(&mut self, frame: &Frame, y: &Matrix) -> Result<(), LearnError> {
        if y.rows() != frame.n_rows() {
            return Err(CoreError::LengthMismatch {
                name: "target".into(),
                expected: frame.n_rows(),
                got: y.rows(),
            }
            .into());
        }
        self.predictors = (0..y.cols())
            .map(|j| {
                let mut p = TabularPredictor::new(ProblemType::Regression, self.config.clone());
                p.fit_regression(frame, &y.column(j))?;
                Ok(p)
            })
            .collect::<Result<_, LearnError>>()?;
        Ok(())
    }

    /// One column per fitted output.
    pub fn predict(&self, frame: &Frame) -> Result<Matrix, LearnError> {
        if self.predictors.is_empty() {
            return Err(LearnError::NotFitted {
                model: "multi-output regressor".into(),
            });
        }
        let columns = self
            .predictors
            .iter()
            .map(|p| p.predict(frame))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Matrix::from_columns(frame.n_rows(), &columns)?)
    }

    pub fn n_outputs(&self) -> usize {
        self.predictors.len()
    }

    pub fn predictors(&self) -> &[TabularPredictor] {
        &self.predictors
    }
}
