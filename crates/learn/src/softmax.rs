//! # Multinomial Logistic Regression
//!
//! A softmax classifier trained by mini-batch gradient descent with
//! momentum. The loss is mean cross-entropy plus an L2 penalty on the
//! non-bias weights:
//!
//! ```text
//! L(W) = -1/n Σᵢ log softmax(xᵢ W)[yᵢ] + l2/2 ‖W‖²
//! ∇L   = Xᵀ (P - Y) / n + l2 W
//! ```

use causeway_core::Matrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::LearnError;
use crate::optim::SgdMomentum;
use crate::traits::{check_features, check_labels, check_rows, Classifier};

/// Training settings for [`SoftmaxClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftmaxParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub momentum: f64,
    pub l2: f64,
    pub batch_size: usize,
    pub seed: u64,
}

impl Default for SoftmaxParams {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 0.1,
            momentum: 0.9,
            l2: 1e-4,
            batch_size: 32,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    pub params: SoftmaxParams,
    /// `(features + 1) x classes`; row 0 is the bias.
    weights: Option<Matrix>,
}

/// Row-wise softmax, shifted by the row maximum.
pub fn softmax_rows(logits: &Matrix) -> Matrix {
    let mut out = logits.clone();
    for i in 0..logits.rows() {
        let row = logits.row(i);
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = row.iter().map(|v| (v - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        for (j, e) in exps.into_iter().enumerate() {
            out.set(i, j, e / total);
        }
    }
    out
}

impl SoftmaxClassifier {
    pub fn new(params: SoftmaxParams) -> Self {
        Self {
            params,
            weights: None,
        }
    }

    pub fn weights(&self) -> Option<&Matrix> {
        self.weights.as_ref()
    }

    fn validate(&self) -> Result<(), LearnError> {
        let p = &self.params;
        if p.batch_size == 0 {
            return Err(LearnError::InvalidHyperparameter {
                name: "batch_size".into(),
                reason: "must be positive".into(),
            });
        }
        if p.learning_rate.is_nan() || p.learning_rate <= 0.0 {
            return Err(LearnError::InvalidHyperparameter {
                name: "learning_rate".into(),
                reason: "must be positive".into(),
            });
        }
        if !(0.0..1.0).contains(&p.momentum) {
            return Err(LearnError::InvalidHyperparameter {
                name: "momentum".into(),
                reason: "must be in [0, 1)".into(),
            });
        }
        Ok(())
    }
}

impl Default for SoftmaxClassifier {
    fn default() -> Self {
        Self::new(SoftmaxParams::default())
    }
}

impl Classifier for SoftmaxClassifier {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), LearnError> {
        check_rows(x, y.len())?;
        check_labels(y, n_classes)?;
        self.validate()?;

        let design = x.with_intercept();
        let mut onehot = Matrix::zeros(y.len(), n_classes);
        for (i, &c) in y.iter().enumerate() {
            onehot.set(i, c, 1.0);
        }

        let mut params = vec![Matrix::zeros(design.cols(), n_classes)];
        let mut optimizer = SgdMomentum::new(self.params.learning_rate, self.params.momentum);
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut order: Vec<usize> = (0..y.len()).collect();

        for epoch in 0..self.params.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(self.params.batch_size) {
                let xb = design.select_rows(batch);
                let probs = softmax_rows(&xb.matmul(&params[0])?);
                let residual = probs.sub(&onehot.select_rows(batch))?;
                let mut grad = xb.transpose().matmul(&residual)?.scale(1.0 / batch.len() as f64);
                for r in 1..grad.rows() {
                    for c in 0..n_classes {
                        let g = grad.get(r, c) + self.params.l2 * params[0].get(r, c);
                        grad.set(r, c, g);
                    }
                }
                optimizer.step(&mut params, std::slice::from_ref(&grad))?;
            }
            trace!(epoch, "softmax epoch done");
        }
        self.weights = params.pop();
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Matrix, LearnError> {
        let w = self.weights.as_ref().ok_or_else(|| LearnError::NotFitted {
            model: "softmax".into(),
        })?;
        check_features(w.rows() - 1, x)?;
        Ok(softmax_rows(&x.with_intercept().matmul(w)?))
    }
}

/// Predicts the training class frequencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorClassifier {
    priors: Option<Vec<f64>>,
}

impl PriorClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for PriorClassifier {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), LearnError> {
        check_rows(x, y.len())?;
        check_labels(y, n_classes)?;
        let mut counts = vec![0.0; n_classes];
        for &c in y {
            counts[c] += 1.0;
        }
        let n = y.len() as f64;
        self.priors = Some(counts.into_iter().map(|c| c / n).collect());
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Matrix, LearnError> {
        let priors = self.priors.as_ref().ok_or_else(|| LearnError::NotFitted {
            model: "prior".into(),
        })?;
        let mut proba = Matrix::zeros(x.rows(), priors.len());
        for i in 0..x.rows() {
            for (j, &p) in priors.iter().enumerate() {
                proba.set(i, j, p);
            }
        }
        Ok(proba)
    }
}
