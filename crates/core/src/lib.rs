//! # Core - Frames, Kinds and Matrices
//!
//! This crate provides the data foundations every other causeway crate
//! builds on:
//!
//! - **Frames**: named, equal-length, typed columns with missing cells
//! - **Kinds**: each column is tagged `Numeric`, `Integer` or `Category`
//!   once, when it is built
//! - **Matrices**: dense row-major `f64` with Cholesky solves
//! - **Diagnostics**: non-fatal findings returned as data
//! - **Errors**: structural failures as a single `CoreError`
//! - **Logging**: a `tracing-subscriber` setup helper
//!
//! ## Design Philosophy
//!
//! Column kinds are data, not a question asked repeatedly. A component that
//! needs to know whether a column is numeric reads `column.kind()`, so two
//! components can never classify the same column differently.

pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod kind;
pub mod logging;
pub mod matrix;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::CoreError;
pub use frame::{Column, ColumnData, Frame, Value};
pub use kind::{classify, ColumnKind};
pub use logging::init_logging;
pub use matrix::Matrix;
