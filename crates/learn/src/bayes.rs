//! # Bayesian Ridge Regression
//!
//! A linear model with Gaussian weight prior `N(0, λ⁻¹ I)` and Gaussian
//! noise of precision `α`. Both precisions carry Gamma hyperpriors and are
//! estimated by maximising the evidence with the fixed-point updates
//!
//! ```text
//! Σ = (λ I + α XᵀX)⁻¹        μ = α Σ Xᵀ y
//! γ = p - λ tr(Σ)
//! λ ← (γ + 2 λ₁) / (‖μ‖² + 2 λ₂)
//! α ← (n - γ + 2 α₁) / (‖y - Xμ‖² + 2 α₂)
//! ```
//!
//! on centred data, stopping when the coefficients move less than `tol`.
//!
//! ## Example
//!
//! ```rust
//! use causeway_core::Matrix;
//! use causeway_learn::{BayesianRidge, Regressor};
//!
//! let x = Matrix::column_vector(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
//! let y = vec![1.0, 3.0, 5.0, 7.0, 9.0];
//!
//! let mut model = BayesianRidge::default();
//! model.fit(&x, &y).unwrap();
//! assert!((model.coef()[0] - 2.0).abs() < 1e-3);
//! ```

use causeway_core::Matrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LearnError;
use crate::traits::{check_features, check_rows, Regressor};

/// Hyperparameters of [`BayesianRidge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesianRidgeParams {
    /// Maximum number of evidence iterations.
    pub n_iter: usize,
    pub tol: f64,
    /// Gamma shape of the noise precision prior.
    pub alpha_1: f64,
    /// Gamma rate of the noise precision prior.
    pub alpha_2: f64,
    /// Gamma shape of the weight precision prior.
    pub lambda_1: f64,
    /// Gamma rate of the weight precision prior.
    pub lambda_2: f64,
    /// Starting noise precision; `1 / var(y)` when unset.
    pub alpha_init: Option<f64>,
    pub lambda_init: Option<f64>,
}

impl Default for BayesianRidgeParams {
    fn default() -> Self {
        Self {
            n_iter: 300,
            tol: 1e-3,
            alpha_1: 1e-6,
            alpha_2: 1e-6,
            lambda_1: 1e-6,
            lambda_2: 1e-6,
            alpha_init: None,
            lambda_init: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesianRidge {
    pub params: BayesianRidgeParams,
    state: Option<Posterior>,
}

/// Fitted posterior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posterior {
    pub coef: Vec<f64>,
    pub intercept: f64,
    /// Estimated noise precision.
    pub alpha: f64,
    /// Estimated weight precision.
    pub lambda: f64,
    /// Posterior covariance of the coefficients.
    pub sigma: Matrix,
    pub x_mean: Vec<f64>,
    pub n_iter: usize,
}

impl BayesianRidge {
    pub fn new(params: BayesianRidgeParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    pub fn posterior(&self) -> Option<&Posterior> {
        self.state.as_ref()
    }

    pub fn coef(&self) -> &[f64] {
        self.state.as_ref().map(|s| s.coef.as_slice()).unwrap_or(&[])
    }

    pub fn intercept(&self) -> f64 {
        self.state.as_ref().map(|s| s.intercept).unwrap_or(0.0)
    }

    /// Posterior mean and predictive standard deviation per row.
    pub fn predict_with_std(&self, x: &Matrix) -> Result<(Vec<f64>, Vec<f64>), LearnError> {
        let s = self.fitted()?;
        check_features(s.coef.len(), x)?;
        let mut mean = Vec::with_capacity(x.rows());
        let mut std = Vec::with_capacity(x.rows());
        for i in 0..x.rows() {
            let row = x.row(i);
            let centred: Vec<f64> = row.iter().zip(&s.x_mean).map(|(v, m)| v - m).collect();
            mean.push(row.iter().zip(&s.coef).map(|(v, c)| v * c).sum::<f64>() + s.intercept);
            let var = s.sigma.quad_form(&centred)? + 1.0 / s.alpha;
            std.push(var.max(0.0).sqrt());
        }
        Ok((mean, std))
    }

    fn fitted(&self) -> Result<&Posterior, LearnError> {
        self.state.as_ref().ok_or_else(|| LearnError::NotFitted {
            model: "bayesian_ridge".into(),
        })
    }

    fn validate(&self) -> Result<(), LearnError> {
        let p = &self.params;
        let positive = [
            ("alpha_1", p.alpha_1),
            ("alpha_2", p.alpha_2),
            ("lambda_1", p.lambda_1),
            ("lambda_2", p.lambda_2),
        ];
        for (name, v) in positive {
            if v.is_nan() || v < 0.0 {
                return Err(LearnError::InvalidHyperparameter {
                    name: name.into(),
                    reason: "must be non-negative".into(),
                });
            }
        }
        if p.n_iter == 0 {
            return Err(LearnError::InvalidHyperparameter {
                name: "n_iter".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

impl Default for BayesianRidge {
    fn default() -> Self {
        Self::new(BayesianRidgeParams::default())
    }
}

/// `Σ = (λI + αG)⁻¹` and `μ = α Σ Xᵀy`.
fn posterior_moments(
    gram: &Matrix,
    xty: &[f64],
    alpha: f64,
    lambda: f64,
) -> Result<(Vec<f64>, Matrix), LearnError> {
    let mut precision = gram.scale(alpha);
    precision.add_diagonal(lambda);
    let sigma = precision.inverse_spd()?;
    let coef = sigma.matvec(xty)?.into_iter().map(|v| v * alpha).collect();
    Ok((coef, sigma))
}

impl Regressor for BayesianRidge {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), LearnError> {
        check_rows(x, y.len())?;
        self.validate()?;
        let n = y.len() as f64;
        let p = x.cols();

        let x_mean = x.column_means();
        let y_mean = y.iter().sum::<f64>() / n;
        let mut xc = x.clone();
        for i in 0..xc.rows() {
            for (j, m) in x_mean.iter().enumerate() {
                xc.set(i, j, xc.get(i, j) - m);
            }
        }
        let yc: Vec<f64> = y.iter().map(|v| v - y_mean).collect();
        let gram = xc.gram();
        let xty = xc.t_matvec(&yc)?;

        let var_y = yc.iter().map(|v| v * v).sum::<f64>() / n;
        let mut alpha = self
            .params
            .alpha_init
            .unwrap_or(1.0 / (var_y + f64::EPSILON));
        let mut lambda = self.params.lambda_init.unwrap_or(1.0);

        let mut coef_old: Option<Vec<f64>> = None;
        let mut iterations = 0;
        for iter in 0..self.params.n_iter {
            iterations = iter + 1;
            let (coef, sigma) = posterior_moments(&gram, &xty, alpha, lambda)?;
            let sse: f64 = xc
                .matvec(&coef)?
                .iter()
                .zip(&yc)
                .map(|(f, t)| (t - f).powi(2))
                .sum();
            let gamma = p as f64 - lambda * sigma.trace();
            let coef_sq: f64 = coef.iter().map(|c| c * c).sum();
            lambda = (gamma + 2.0 * self.params.lambda_1) / (coef_sq + 2.0 * self.params.lambda_2);
            alpha = (n - gamma + 2.0 * self.params.alpha_1) / (sse + 2.0 * self.params.alpha_2);

            let converged = coef_old.as_ref().is_some_and(|old| {
                old.iter().zip(&coef).map(|(a, b)| (a - b).abs()).sum::<f64>() < self.params.tol
            });
            coef_old = Some(coef);
            if converged {
                break;
            }
        }

        let (coef, sigma) = posterior_moments(&gram, &xty, alpha, lambda)?;
        let intercept = y_mean - coef.iter().zip(&x_mean).map(|(c, m)| c * m).sum::<f64>();
        debug!(alpha, lambda, iterations, "bayesian ridge converged");
        self.state = Some(Posterior {
            coef,
            intercept,
            alpha,
            lambda,
            sigma,
            x_mean,
            n_iter: iterations,
        });
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, LearnError> {
        let s = self.fitted()?;
        check_features(s.coef.len(), x)?;
        Ok(x.matvec(&s.coef)?
            .into_iter()
            .map(|v| v + s.intercept)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> (Matrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let a = i as f64 / 10.0;
                let b = ((i * 7) % 13) as f64 / 5.0;
                vec![a, b]
            })
            .collect();
        let y = rows.iter().map(|r| 0.5 + 1.5 * r[0] - 2.0 * r[1]).collect();
        (Matrix::from_rows(rows).unwrap(), y)
    }

    #[test]
    fn test_recovers_noiseless_coefficients() {
        let (x, y) = linear_data();
        let mut model = BayesianRidge::default();
        model.fit(&x, &y).unwrap();
        assert!((model.coef()[0] - 1.5).abs() < 1e-3);
        assert!((model.coef()[1] + 2.0).abs() < 1e-3);
        assert!((model.intercept() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_std_positive_and_grows_away_from_data() {
        let (x, y) = linear_data();
        let mut noisy = y.clone();
        for (i, v) in noisy.iter_mut().enumerate() {
            *v += if i % 2 == 0 { 0.3 } else { -0.3 };
        }
        let mut model = BayesianRidge::default();
        model.fit(&x, &noisy).unwrap();
        let points = Matrix::from_rows(vec![vec![2.0, 1.0], vec![200.0, 100.0]]).unwrap();
        let (_, std) = model.predict_with_std(&points).unwrap();
        assert!(std[0] > 0.0);
        assert!(std[1] > std[0]);
    }

    #[test]
    fn test_sigma_is_symmetric() {
        let (x, y) = linear_data();
        let mut model = BayesianRidge::default();
        model.fit(&x, &y).unwrap();
        let s = &model.posterior().unwrap().sigma;
        assert!((s.get(0, 1) - s.get(1, 0)).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_prior_rejected() {
        let mut model = BayesianRidge::new(BayesianRidgeParams {
            alpha_1: -1.0,
            ..BayesianRidgeParams::default()
        });
        let (x, y) = linear_data();
        assert!(matches!(
            model.fit(&x, &y),
            Err(LearnError::InvalidHyperparameter { .. })
        ));
    }
}
