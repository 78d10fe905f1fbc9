//! Closed-form linear regression.

use causeway_core::Matrix;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::LearnError;
use crate::traits::{check_features, check_rows, Regressor};

/// Ridge regression with an unpenalised intercept.
///
/// Solves `(XcᵀWXc + αI) β = XcᵀW yc` where `Xc`, `yc` are centred on their
/// weighted means. With `alpha = 0` this is ordinary (weighted) least
/// squares and fails on a rank-deficient design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ridge {
    pub alpha: f64,
    coef: Vec<f64>,
    intercept: f64,
    fitted: bool,
}

impl Ridge {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coef: Vec::new(),
            intercept: 0.0,
            fitted: false,
        }
    }

    pub fn coef(&self) -> &[f64] {
        &self.coef
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Fit with per-row weights. Rows with zero weight are ignored.
    pub fn fit_weighted(&mut self, x: &Matrix, y: &[f64], w: &[f64]) -> Result<(), LearnError> {
        check_rows(x, y.len())?;
        if w.len() != y.len() {
            return Err(causeway_core::CoreError::shape((y.len(), 1), (w.len(), 1)).into());
        }
        if self.alpha < 0.0 {
            return Err(LearnError::InvalidHyperparameter {
                name: "alpha".into(),
                reason: "must be non-negative".into(),
            });
        }
        let total: f64 = w.iter().sum();
        if total <= 0.0 {
            return Err(LearnError::EmptyTrainingSet);
        }
        let p = x.cols();
        let mut x_mean = vec![0.0; p];
        for (i, &wi) in w.iter().enumerate() {
            for (m, v) in x_mean.iter_mut().zip(x.row(i)) {
                *m += wi * v;
            }
        }
        x_mean.iter_mut().for_each(|m| *m /= total);
        let y_mean = y.iter().zip(w).map(|(a, b)| a * b).sum::<f64>() / total;

        let xc = Matrix::from_vec(
            x.rows(),
            p,
            (0..x.rows())
                .flat_map(|i| x.row(i).iter().zip(&x_mean).map(|(v, m)| v - m).collect::<Vec<_>>())
                .collect(),
        )?;
        let yc: Vec<f64> = y.iter().zip(w).map(|(v, wi)| (v - y_mean) * wi).collect();

        self.coef = if p == 0 {
            Vec::new()
        } else {
            let mut gram = xc.weighted_gram(w)?;
            gram.add_diagonal(self.alpha);
            gram.solve_spd(&xc.t_matvec(&yc)?)?
        };
        self.intercept = y_mean - self.coef.iter().zip(&x_mean).map(|(c, m)| c * m).sum::<f64>();
        self.fitted = true;
        trace!(alpha = self.alpha, features = p, "ridge fitted");
        Ok(())
    }
}

impl Default for Ridge {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Regressor for Ridge {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), LearnError> {
        self.fit_weighted(x, y, &vec![1.0; y.len()])
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, LearnError> {
        if !self.fitted {
            return Err(LearnError::NotFitted {
                model: "ridge".into(),
            });
        }
        check_features(self.coef.len(), x)?;
        Ok(x.matvec(&self.coef)?
            .into_iter()
            .map(|v| v + self.intercept)
            .collect())
    }
}

/// Predicts the training mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanRegressor {
    mean: Option<f64>,
}

impl MeanRegressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Regressor for MeanRegressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), LearnError> {
        check_rows(x, y.len())?;
        self.mean = Some(y.iter().sum::<f64>() / y.len() as f64);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, LearnError> {
        let mean = self.mean.ok_or_else(|| LearnError::NotFitted {
            model: "mean".into(),
        })?;
        Ok(vec![mean; x.rows()])
    }
}
