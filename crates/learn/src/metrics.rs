//! Scoring functions.
//!
//! All regression metrics take `(truth, prediction)` in that order.

use causeway_core::Matrix;

/// Mean squared error. Empty input scores 0.
pub fn mse(truth: &[f64], pred: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let sum: f64 = truth.iter().zip(pred).map(|(t, p)| (t - p).powi(2)).sum();
    sum / truth.len() as f64
}

pub fn rmse(truth: &[f64], pred: &[f64]) -> f64 {
    mse(truth, pred).sqrt()
}

pub fn mae(truth: &[f64], pred: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let sum: f64 = truth.iter().zip(pred).map(|(t, p)| (t - p).abs()).sum();
    sum / truth.len() as f64
}

/// Coefficient of determination.
///
/// A constant target scores 1 when predicted exactly and 0 otherwise.
/// Fewer than two samples give NaN: there is no variance to explain.
pub fn r2(truth: &[f64], pred: &[f64]) -> f64 {
    if truth.len() < 2 {
        return f64::NAN;
    }
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = truth.iter().zip(pred).map(|(t, p)| (t - p).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn accuracy(truth: &[usize], pred: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(pred).filter(|(t, p)| t == p).count();
    hits as f64 / truth.len() as f64
}

/// Mean negative log-likelihood of the true classes.
pub fn log_loss(truth: &[usize], proba: &Matrix) -> f64 {
    const EPS: f64 = 1e-15;
    if truth.is_empty() {
        return 0.0;
    }
    let sum: f64 = truth
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let p = if c < proba.cols() { proba.get(i, c) } else { 0.0 };
            -p.clamp(EPS, 1.0 - EPS).ln()
        })
        .sum();
    sum / truth.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_and_rmse() {
        let t = [1.0, 2.0, 3.0];
        let p = [1.0, 2.0, 5.0];
        assert!((mse(&t, &p) - 4.0 / 3.0).abs() < 1e-12);
        assert!((rmse(&t, &p) - (4.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_r2_perfect_and_mean() {
        let t = [1.0, 2.0, 3.0];
        assert!((r2(&t, &t) - 1.0).abs() < 1e-12);
        assert!(r2(&t, &[2.0, 2.0, 2.0]).abs() < 1e-12);
        assert_eq!(r2(&[1.0, 1.0], &[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_r2_undefined_below_two_samples() {
        assert!(r2(&[3.0], &[3.0]).is_nan());
        assert!(r2(&[], &[]).is_nan());
    }

    #[test]
    fn test_log_loss_confident() {
        let proba = Matrix::from_rows(vec![vec![0.9, 0.1], vec![0.2, 0.8]]).unwrap();
        let expected = -(0.9f64.ln() + 0.8f64.ln()) / 2.0;
        assert!((log_loss(&[0, 1], &proba) - expected).abs() < 1e-12);
    }
}
