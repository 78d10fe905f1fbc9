//! # Outcome and Treatment Encoding
//!
//! The estimators regress on real-valued matrices. This module turns the
//! target and treatment columns into such matrices and back.
//!
//! ## Outcome
//!
//! A numeric target is used as it is, as one column. A categorical target
//! becomes one column per class holding `logit(p)`, where `p` is either a
//! supplied class-probability matrix or the one-hot encoding of the
//! labels. Logits are clipped to `[LOGIT_MIN_VALUE, LOGIT_MAX_VALUE]` so
//! that certain classes stay finite.
//!
//! ```rust
//! use causeway_core::Column;
//! use causeway_causal::encoder::{Decoded, OutcomeEncoder, LOGIT_MAX_VALUE};
//!
//! let target = Column::text("churn", ["no", "yes", "no"]);
//! let (encoder, encoded) = OutcomeEncoder::fit(&target, None).unwrap();
//! assert_eq!(encoded.shape(), (3, 2));
//! assert_eq!(encoded.get(1, 1), LOGIT_MAX_VALUE);
//!
//! match encoder.decode(&encoded).unwrap() {
//!     Decoded::Labels(labels) => assert_eq!(labels[1].as_deref(), Some("yes")),
//!     Decoded::Numeric(_) => unreachable!(),
//! }
//! ```
//!
//! ## Treatment
//!
//! A numeric treatment is one column of values. A categorical treatment is
//! one-hot encoded without its first (sorted) level, which becomes the
//! baseline every effect is measured against.

use causeway_core::{Column, Matrix};
use causeway_prep::OneHotEncoder;
use serde::{Deserialize, Serialize};

use crate::error::CausalError;

pub const LOGIT_MIN_VALUE: f64 = -10.0;
pub const LOGIT_MAX_VALUE: f64 = 10.0;

/// Log-odds. Gives ±∞ at 0 and 1.
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Logistic function, the inverse of [`logit`].
pub fn expit(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn clipped_logit(p: f64) -> f64 {
    logit(p).clamp(LOGIT_MIN_VALUE, LOGIT_MAX_VALUE)
}

/// Target values recovered from the encoded space.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Missing where the encoded value is NaN.
    Numeric(Vec<Option<f64>>),
    /// Missing where no class rises above the clip floor.
    Labels(Vec<Option<String>>),
}

/// Encoding of the target, fixed at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeEncoder {
    Numeric,
    Categorical { classes: OneHotEncoder },
}

impl OutcomeEncoder {
    /// Choose the encoding from the target's kind and encode it.
    pub fn fit(target: &Column, proba: Option<&Matrix>) -> Result<(Self, Matrix), CausalError> {
        let encoder = if target.kind().is_numeric() {
            OutcomeEncoder::Numeric
        } else {
            OutcomeEncoder::Categorical {
                classes: OneHotEncoder::fit(target),
            }
        };
        let encoded = encoder.encode(target, proba)?;
        Ok((encoder, encoded))
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, OutcomeEncoder::Categorical { .. })
    }

    /// Class names in column order; empty for a numeric target.
    pub fn classes(&self) -> &[String] {
        match self {
            OutcomeEncoder::Numeric => &[],
            OutcomeEncoder::Categorical { classes } => classes.categories(),
        }
    }

    /// Number of encoded columns.
    pub fn width(&self) -> usize {
        match self {
            OutcomeEncoder::Numeric => 1,
            OutcomeEncoder::Categorical { classes } => classes.n_categories(),
        }
    }

    /// Encode `target`. For a numeric target `proba` is ignored and
    /// missing cells become NaN.
    pub fn encode(&self, target: &Column, proba: Option<&Matrix>) -> Result<Matrix, CausalError> {
        match self {
            OutcomeEncoder::Numeric => Ok(Matrix::column_vector(
                (0..target.len())
                    .map(|r| target.f64_at(r).unwrap_or(f64::NAN))
                    .collect(),
            )),
            OutcomeEncoder::Categorical { classes } => {
                let probabilities = match proba {
                    Some(p) => {
                        check_proba(p, target.len(), classes.n_categories())?;
                        p.clone()
                    }
                    None => classes.transform(target),
                };
                Ok(probabilities.map(clipped_logit))
            }
        }
    }

    /// Invert [`encode`](Self::encode): identity for numbers, `expit` then
    /// arg-max for classes.
    pub fn decode(&self, encoded: &Matrix) -> Result<Decoded, CausalError> {
        if encoded.cols() != self.width() {
            return Err(CausalError::validation(format!(
                "encoded outcome has {} columns, expected {}",
                encoded.cols(),
                self.width()
            )));
        }
        match self {
            OutcomeEncoder::Numeric => Ok(Decoded::Numeric(
                encoded
                    .column(0)
                    .into_iter()
                    .map(|v| if v.is_nan() { None } else { Some(v) })
                    .collect(),
            )),
            OutcomeEncoder::Categorical { classes } => {
                let floor = expit(LOGIT_MIN_VALUE);
                let probabilities = encoded.map(|v| {
                    let p = expit(v);
                    if p > floor {
                        p
                    } else {
                        0.0
                    }
                });
                Ok(Decoded::Labels(classes.inverse_transform(&probabilities)))
            }
        }
    }
}

fn check_proba(proba: &Matrix, rows: usize, classes: usize) -> Result<(), CausalError> {
    if proba.shape() != (rows, classes) {
        return Err(CausalError::validation(format!(
            "target_proba must be {}x{} (rows x classes), got {}x{}",
            rows,
            classes,
            proba.rows(),
            proba.cols()
        )));
    }
    if let Some(bad) = proba.data().iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(CausalError::validation(format!(
            "target_proba holds {}, outside [0, 1]",
            bad
        )));
    }
    Ok(())
}

/// Encoding of the treatment, fixed at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreatmentEncoder {
    Continuous,
    /// Sorted levels; the first is the baseline.
    Discrete { levels: Vec<String> },
}

impl TreatmentEncoder {
    /// Learn the encoding. A treatment that never varies is rejected.
    pub fn fit(column: &Column) -> Result<Self, CausalError> {
        if column.kind().is_numeric() {
            let values = continuous_values(column)?;
            if values.windows(2).all(|w| w[0] == w[1]) {
                return Err(CausalError::validation(format!(
                    "treatment {} is constant",
                    column.name()
                )));
            }
            Ok(TreatmentEncoder::Continuous)
        } else {
            let levels = column.distinct_labels();
            if levels.len() < 2 {
                return Err(CausalError::validation(format!(
                    "treatment {} needs at least two levels, found {}",
                    column.name(),
                    levels.len()
                )));
            }
            Ok(TreatmentEncoder::Discrete { levels })
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, TreatmentEncoder::Discrete { .. })
    }

    /// Number of levels; zero for a continuous treatment.
    pub fn n_levels(&self) -> usize {
        match self {
            TreatmentEncoder::Continuous => 0,
            TreatmentEncoder::Discrete { levels } => levels.len(),
        }
    }

    /// Number of encoded columns.
    pub fn width(&self) -> usize {
        match self {
            TreatmentEncoder::Continuous => 1,
            TreatmentEncoder::Discrete { levels } => levels.len() - 1,
        }
    }

    /// Level index of every row. Fails on missing or unseen levels.
    pub fn indices(&self, column: &Column) -> Result<Vec<usize>, CausalError> {
        let TreatmentEncoder::Discrete { levels } = self else {
            return Err(CausalError::validation("continuous treatment has no levels"));
        };
        (0..column.len())
            .map(|r| {
                let label = column.label(r).ok_or_else(|| {
                    CausalError::validation(format!("{} is missing at row {}", column.name(), r))
                })?;
                levels.binary_search(&label).map_err(|_| {
                    CausalError::validation(format!(
                        "{} has unknown level {:?} at row {}",
                        column.name(),
                        label,
                        r
                    ))
                })
            })
            .collect()
    }

    /// Rows × [`width`](Self::width) matrix.
    pub fn encode(&self, column: &Column) -> Result<Matrix, CausalError> {
        match self {
            TreatmentEncoder::Continuous => Ok(Matrix::column_vector(continuous_values(column)?)),
            TreatmentEncoder::Discrete { .. } => {
                let indices = self.indices(column)?;
                let mut m = Matrix::zeros(indices.len(), self.width());
                for (r, &i) in indices.iter().enumerate() {
                    if i > 0 {
                        m.set(r, i - 1, 1.0);
                    }
                }
                Ok(m)
            }
        }
    }
}

fn continuous_values(column: &Column) -> Result<Vec<f64>, CausalError> {
    (0..column.len())
        .map(|r| {
            column.f64_at(r).ok_or_else(|| {
                CausalError::validation(format!("{} is missing at row {}", column.name(), r))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_identity() {
        let target = Column::float_opt("y", vec![Some(1.5), None, Some(-2.0)]);
        let (encoder, encoded) = OutcomeEncoder::fit(&target, None).unwrap();
        assert_eq!(encoder, OutcomeEncoder::Numeric);
        assert_eq!(
            encoder.decode(&encoded).unwrap(),
            Decoded::Numeric(vec![Some(1.5), None, Some(-2.0)])
        );
    }

    #[test]
    fn test_probabilities_clipped() {
        let target = Column::text("y", ["a", "b"]);
        let proba = Matrix::from_rows(vec![vec![0.0, 1.0], vec![0.5, 0.5]]).unwrap();
        let (_, encoded) = OutcomeEncoder::fit(&target, Some(&proba)).unwrap();
        assert_eq!(encoded.row(0), &[LOGIT_MIN_VALUE, LOGIT_MAX_VALUE]);
        assert_eq!(encoded.row(1), &[0.0, 0.0]);
    }

    #[test]
    fn test_proba_shape_checked() {
        let target = Column::text("y", ["a", "b", "c"]);
        let proba = Matrix::zeros(3, 2);
        assert!(matches!(
            OutcomeEncoder::fit(&target, Some(&proba)),
            Err(CausalError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_label_decodes_missing() {
        let (encoder, _) = OutcomeEncoder::fit(&Column::text("y", ["a", "b"]), None).unwrap();
        let encoded = encoder
            .encode(&Column::text_opt("y", vec![Some("z".into()), None, Some("b".into())]), None)
            .unwrap();
        assert_eq!(encoded.row(0), &[LOGIT_MIN_VALUE, LOGIT_MIN_VALUE]);
        assert_eq!(
            encoder.decode(&encoded).unwrap(),
            Decoded::Labels(vec![None, None, Some("b".into())])
        );
    }

    #[test]
    fn test_shifted_logits_change_class() {
        let (encoder, encoded) = OutcomeEncoder::fit(&Column::text("y", ["a", "b"]), None).unwrap();
        let shift = Matrix::from_rows(vec![vec![0.0, 0.0], vec![15.0, -15.0]]).unwrap();
        let moved = encoded.add(&shift).unwrap();
        assert_eq!(
            encoder.decode(&moved).unwrap(),
            Decoded::Labels(vec![Some("a".into()), Some("a".into())])
        );
    }

    #[test]
    fn test_treatment_baseline_level() {
        let t = Column::text("t", ["b", "a", "c", "a"]);
        let enc = TreatmentEncoder::fit(&t).unwrap();
        assert_eq!(enc.width(), 2);
        let m = enc.encode(&t).unwrap();
        assert_eq!(m.row(0), &[1.0, 0.0]);
        assert_eq!(m.row(1), &[0.0, 0.0]);
        assert_eq!(m.row(2), &[0.0, 1.0]);
    }

    #[test]
    fn test_treatment_without_variation() {
        assert!(TreatmentEncoder::fit(&Column::float("t", vec![2.0; 4])).is_err());
        assert!(TreatmentEncoder::fit(&Column::text("t", ["x", "x"])).is_err());
    }

    #[test]
    fn test_unknown_treatment_level() {
        let enc = TreatmentEncoder::fit(&Column::text("t", ["a", "b"])).unwrap();
        assert!(matches!(
            enc.encode(&Column::text("t", ["c"])),
            Err(CausalError::Validation(_))
        ));
    }
}
