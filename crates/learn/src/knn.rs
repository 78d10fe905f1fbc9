//! k-nearest-neighbour learners with brute-force Euclidean search.

use causeway_core::Matrix;
use serde::{Deserialize, Serialize};

use crate::error::LearnError;
use crate::traits::{check_features, check_labels, check_rows, Classifier, Regressor};

fn validate_k(k: usize) -> Result<(), LearnError> {
    if k == 0 {
        return Err(LearnError::InvalidHyperparameter {
            name: "k".into(),
            reason: "must be positive".into(),
        });
    }
    Ok(())
}

/// Indices of the `k` training rows closest to `query`. Ties keep the
/// lower index.
fn nearest(train: &Matrix, query: &[f64], k: usize) -> Vec<usize> {
    let mut dist: Vec<(f64, usize)> = (0..train.rows())
        .map(|i| {
            let d = train
                .row(i)
                .iter()
                .zip(query)
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>();
            (d, i)
        })
        .collect();
    dist.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    dist.into_iter().take(k).map(|(_, i)| i).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnRegressor {
    pub k: usize,
    train: Option<(Matrix, Vec<f64>)>,
}

impl KnnRegressor {
    pub fn new(k: usize) -> Self {
        Self { k, train: None }
    }
}

impl Regressor for KnnRegressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), LearnError> {
        check_rows(x, y.len())?;
        validate_k(self.k)?;
        self.train = Some((x.clone(), y.to_vec()));
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, LearnError> {
        let (train, y) = self.train.as_ref().ok_or_else(|| LearnError::NotFitted {
            model: "knn".into(),
        })?;
        check_features(train.cols(), x)?;
        Ok((0..x.rows())
            .map(|i| {
                let idx = nearest(train, x.row(i), self.k);
                idx.iter().map(|&j| y[j]).sum::<f64>() / idx.len() as f64
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnClassifier {
    pub k: usize,
    n_classes: usize,
    train: Option<(Matrix, Vec<usize>)>,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_classes: 0,
            train: None,
        }
    }
}

impl Classifier for KnnClassifier {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), LearnError> {
        check_rows(x, y.len())?;
        check_labels(y, n_classes)?;
        validate_k(self.k)?;
        self.n_classes = n_classes;
        self.train = Some((x.clone(), y.to_vec()));
        Ok(())
    }

    /// Neighbour vote shares.
    fn predict_proba(&self, x: &Matrix) -> Result<Matrix, LearnError> {
        let (train, y) = self.train.as_ref().ok_or_else(|| LearnError::NotFitted {
            model: "knn".into(),
        })?;
        check_features(train.cols(), x)?;
        let mut proba = Matrix::zeros(x.rows(), self.n_classes);
        for i in 0..x.rows() {
            let idx = nearest(train, x.row(i), self.k);
            let share = 1.0 / idx.len() as f64;
            for j in idx {
                let c = y[j];
                proba.set(i, c, proba.get(i, c) + share);
            }
        }
        Ok(proba)
    }
}
