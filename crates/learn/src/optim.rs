//! # Optimization
//!
//! Gradient-descent updates for the iteratively trained learners.
//!
//! ## Example
//!
//! ```rust
//! use causeway_core::Matrix;
//! use causeway_learn::optim::SgdMomentum;
//!
//! let mut params = vec![Matrix::full(2, 2, 1.0)];
//! let grads = vec![Matrix::full(2, 2, 0.5)];
//!
//! let mut optimizer = SgdMomentum::new(0.1, 0.9);
//! optimizer.step(&mut params, &grads).unwrap();
//! assert!((params[0].get(0, 0) - 0.95).abs() < 1e-12);
//! ```

use causeway_core::{CoreError, Matrix};

use crate::error::LearnError;

/// SGD with momentum.
///
/// Updates parameters using:
/// - `v = momentum * v + grad`
/// - `θ = θ - lr * v`
#[derive(Debug, Clone)]
pub struct SgdMomentum {
    pub learning_rate: f64,
    /// Momentum coefficient (typically 0.9)
    pub momentum: f64,
    velocities: Vec<Matrix>,
}

impl SgdMomentum {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
            velocities: Vec::new(),
        }
    }

    fn init(&mut self, params: &[Matrix]) {
        self.velocities = params
            .iter()
            .map(|p| Matrix::zeros(p.rows(), p.cols()))
            .collect();
    }

    /// One update step. Parameter and gradient shapes must agree pairwise.
    pub fn step(&mut self, params: &mut [Matrix], grads: &[Matrix]) -> Result<(), LearnError> {
        if self.velocities.len() != params.len() {
            self.init(params);
        }
        if grads.len() != params.len() {
            return Err(CoreError::ShapeMismatch {
                expected: format!("{} gradients", params.len()),
                got: format!("{} gradients", grads.len()),
            }
            .into());
        }

        for ((param, grad), velocity) in params
            .iter_mut()
            .zip(grads)
            .zip(self.velocities.iter_mut())
        {
            if param.shape() != grad.shape() {
                return Err(CoreError::shape(param.shape(), grad.shape()).into());
            }
            // v = momentum * v + grad
            *velocity = velocity.scale(self.momentum).add(grad)?;
            // θ = θ - lr * v
            *param = param.sub(&velocity.scale(self.learning_rate))?;
        }
        Ok(())
    }
}
