//! # Prep - Frame Cleaning and Encoding
//!
//! Data-cleaning steps that run before any model sees a frame:
//!
//! - **Imputation**: median/mode or constant fills, learned once and
//!   reusable on new rows
//! - **Percentages**: `"12.5%"` text columns become floats
//! - **One-hot**: sorted levels, unknown labels encode to zeros
//! - **Expansion**: polynomial monomials plus categorical dummies
//!
//! ## Example
//!
//! ```rust
//! use causeway_core::{Column, Frame};
//! use causeway_prep::{impute_median_mode, parse_percentages};
//!
//! let raw = Frame::new(vec![
//!     Column::text_opt("rate", vec![Some("5%".into()), None, Some("15%".into())]),
//! ]).unwrap();
//!
//! let parsed = parse_percentages(&raw).unwrap();
//! let clean = impute_median_mode(&parsed).unwrap();
//! assert_eq!(clean.column("rate").unwrap().f64_at(1), Some(10.0));
//! ```

pub mod error;
pub mod impute;
pub mod onehot;
pub mod percent;
pub mod poly;

pub use error::PrepError;
pub use impute::{impute_median_mode, median, FittedImputer, ImputeStrategy, Imputer};
pub use onehot::OneHotEncoder;
pub use percent::{parse_percentages, PercentageParser, PERCENTAGE_PATTERN};
pub use poly::{expand_polynomial_categorical, monomial_name, standardize, PolynomialExpansion};
