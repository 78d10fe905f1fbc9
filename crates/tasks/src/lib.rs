//! # Tasks - Runnable Analyses
//!
//! Each task takes a frame and serde-friendly parameters and returns a
//! [`TaskResult`] envelope:
//!
//! - [`InterventionTask`]: effects of moving a treatment column to new values
//! - [`BayesianRegressionTask`]: tuned Bayesian ridge with coefficient priors
//!   and per-feature refits
//! - [`timeseries`]: parameters of the constant-value forecaster
//!
//! ## Example
//!
//! ```rust
//! use causeway_core::{Column, Frame};
//! use causeway_tasks::{BayesianRegressionParams, BayesianRegressionTask};
//!
//! let x: Vec<f64> = (0..30).map(|i| i as f64).collect();
//! let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
//! let frame = Frame::new(vec![Column::float("x", x), Column::float("y", y)]).unwrap();
//!
//! let result = BayesianRegressionTask
//!     .run(&frame, &BayesianRegressionParams::new(["x"], "y"))
//!     .unwrap();
//! assert!(result.is_success());
//! let data = result.data.unwrap();
//! assert!((data.coeffs.multivariate[0].mean - 2.0).abs() < 0.05);
//! ```

pub mod bayesian;
pub mod error;
pub mod intervention;
pub mod task;
pub mod timeseries;

pub use bayesian::{
    BayesianRegressionData, BayesianRegressionParams, BayesianRegressionTask, CoefficientPdf, Prior,
};
pub use error::TaskError;
pub use intervention::{InterventionData, InterventionParams, InterventionTask};
pub use task::{TaskResult, TaskStatus, TaskType};
pub use timeseries::{ConstantValueParams, ConstantValuePredictor};
