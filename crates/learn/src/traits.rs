//! Fit/predict contracts shared by every learner.
//!
//! Learners take an already numeric design matrix. Turning a frame into one
//! is the job of [`crate::features`].

use causeway_core::Matrix;

use crate::error::LearnError;
use crate::metrics;

/// A model of a continuous target.
pub trait Regressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), LearnError>;

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, LearnError>;

    /// R² on the given data.
    fn score(&self, x: &Matrix, y: &[f64]) -> Result<f64, LearnError> {
        Ok(metrics::r2(y, &self.predict(x)?))
    }
}

/// A model of a class index in `0..n_classes`.
pub trait Classifier {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), LearnError>;

    /// One row per sample, one column per class. Rows sum to one.
    fn predict_proba(&self, x: &Matrix) -> Result<Matrix, LearnError>;

    fn predict(&self, x: &Matrix) -> Result<Vec<usize>, LearnError> {
        let proba = self.predict_proba(x)?;
        Ok((0..proba.rows()).map(|i| argmax(proba.row(i))).collect())
    }

    /// Accuracy on the given data.
    fn score(&self, x: &Matrix, y: &[usize]) -> Result<f64, LearnError> {
        Ok(metrics::accuracy(y, &self.predict(x)?))
    }
}

/// Index of the largest value; the first wins ties. Empty input gives 0.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

pub(crate) fn check_labels(y: &[usize], n_classes: usize) -> Result<(), LearnError> {
    match y.iter().find(|&&l| l >= n_classes) {
        Some(&label) => Err(LearnError::InvalidLabel { label, n_classes }),
        None => Ok(()),
    }
}

pub(crate) fn check_rows(x: &Matrix, n: usize) -> Result<(), LearnError> {
    if x.rows() != n {
        return Err(causeway_core::CoreError::shape((n, x.cols()), x.shape()).into());
    }
    if n == 0 {
        return Err(LearnError::EmptyTrainingSet);
    }
    Ok(())
}

pub(crate) fn check_features(expected: usize, x: &Matrix) -> Result<(), LearnError> {
    if x.cols() != expected {
        return Err(LearnError::FeatureMismatch {
            expected,
            got: x.cols(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_check_labels() {
        assert!(check_labels(&[0, 1], 2).is_ok());
        assert_eq!(
            check_labels(&[0, 2], 2).unwrap_err(),
            LearnError::InvalidLabel {
                label: 2,
                n_classes: 2
            }
        );
    }
}
