//! Univariate normal distribution.
//!
//! Used for interval widths (`ppf`) and for the coefficient densities
//! reported by Bayesian regression (`pdf`).
//!
//! # Example
//!
//! ```rust
//! use causeway_causal::gaussian::Normal;
//!
//! let z = Normal::standard().ppf(0.975);
//! assert!((z - 1.959964).abs() < 1e-6);
//!
//! let n = Normal::new(7.0, 0.5).unwrap();
//! assert!((n.cdf(7.0) - 0.5).abs() < 1e-7);
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::CausalError;

/// N(μ, σ²).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normal {
    pub mean: f64,
    pub std_dev: f64,
}

impl Normal {
    /// # Errors
    /// Returns a validation error if `std_dev` is negative or not finite.
    pub fn new(mean: f64, std_dev: f64) -> Result<Self, CausalError> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(CausalError::validation(format!(
                "standard deviation must be non-negative, got {}",
                std_dev
            )));
        }
        Ok(Self { mean, std_dev })
    }

    /// N(0, 1).
    pub fn standard() -> Self {
        Self {
            mean: 0.0,
            std_dev: 1.0,
        }
    }

    /// Density at `x`. A point mass has infinite density at its mean.
    pub fn pdf(&self, x: f64) -> f64 {
        if self.std_dev == 0.0 {
            return if x == self.mean { f64::INFINITY } else { 0.0 };
        }
        let z = (x - self.mean) / self.std_dev;
        (-0.5 * z * z).exp() / (self.std_dev * (2.0 * PI).sqrt())
    }

    /// P(X ≤ x).
    pub fn cdf(&self, x: f64) -> f64 {
        if self.std_dev == 0.0 {
            return if x < self.mean { 0.0 } else { 1.0 };
        }
        let z = (x - self.mean) / (self.std_dev * 2.0_f64.sqrt());
        0.5 * (1.0 + erf(z))
    }

    /// Quantile function: the `x` with `cdf(x) = p`.
    ///
    /// `p = 0` and `p = 1` give the infinite endpoints; anything outside
    /// `[0, 1]` gives NaN.
    pub fn ppf(&self, p: f64) -> f64 {
        self.mean + self.std_dev * standard_quantile(p)
    }
}

/// Two-sided critical value `z(1 - alpha / 2)`.
pub fn two_sided_z(alpha: f64) -> f64 {
    standard_quantile(1.0 - alpha / 2.0)
}

/// Acklam's rational approximation, relative error below 1.2e-9.
fn standard_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };
    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Error function, Abramowitz and Stegun 7.1.26. Accurate to about 1.5e-7.
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_peak() {
        let n = Normal::standard();
        assert!((n.pdf(0.0) - 0.398_942_280_4).abs() < 1e-9);
        assert_eq!(n.pdf(1.0), n.pdf(-1.0));
    }

    #[test]
    fn test_ppf_inverts_cdf() {
        let n = Normal::new(2.0, 3.0).unwrap();
        for &p in &[0.001, 0.02, 0.3, 0.5, 0.8, 0.99] {
            assert!((n.cdf(n.ppf(p)) - p).abs() < 1e-6, "p = {}", p);
        }
    }

    #[test]
    fn test_ppf_endpoints() {
        let n = Normal::standard();
        assert_eq!(n.ppf(0.0), f64::NEG_INFINITY);
        assert_eq!(n.ppf(1.0), f64::INFINITY);
        assert!(n.ppf(1.5).is_nan());
        assert_eq!(n.ppf(0.5), 0.0);
    }

    #[test]
    fn test_two_sided_z() {
        assert!((two_sided_z(0.05) - 1.959964).abs() < 1e-6);
        assert!((two_sided_z(0.1) - 1.644854).abs() < 1e-6);
    }

    #[test]
    fn test_negative_std_rejected() {
        assert!(Normal::new(0.0, -1.0).is_err());
    }

    #[test]
    fn test_erf_symmetry() {
        assert!(erf(0.0).abs() < 1e-8);
        assert!((erf(1.0) + erf(-1.0)).abs() < 1e-12);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
    }
}
