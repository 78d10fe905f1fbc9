//! # Imputation
//!
//! Missing cells are filled per column, with one strategy for numeric-like
//! columns and another for categorical ones. Fill values are learned by
//! [`Imputer::fit`] and applied by [`FittedImputer::transform`], so the
//! same fills can be reused on new rows.
//!
//! ```rust
//! use causeway_core::{Column, Frame};
//! use causeway_prep::impute_median_mode;
//!
//! let frame = Frame::new(vec![
//!     Column::float_opt("x", vec![Some(1.0), None, Some(3.0)]),
//!     Column::text_opt("c", vec![Some("a".into()), Some("a".into()), None]),
//! ]).unwrap();
//!
//! let filled = impute_median_mode(&frame).unwrap();
//! assert_eq!(filled.column("x").unwrap().f64_at(1), Some(2.0));
//! assert_eq!(filled.column("c").unwrap().label(2), Some("a".into()));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use causeway_core::{Column, ColumnData, ColumnKind, Frame, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PrepError;

/// How a column's fill value is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Median of the present cells. Integer columns round to nearest.
    Median,
    /// Most frequent present cell; ties go to the smallest value.
    MostFrequent,
    /// The imputer's configured constant.
    Constant,
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImputeStrategy::Median => "median",
            ImputeStrategy::MostFrequent => "most_frequent",
            ImputeStrategy::Constant => "constant",
        };
        write!(f, "{}", s)
    }
}

/// Imputation settings.
///
/// The default fills numeric-like columns with `0` and categorical columns
/// with `"NA"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Imputer {
    pub numeric: ImputeStrategy,
    pub categorical: ImputeStrategy,
    pub numeric_fill: f64,
    pub categorical_fill: String,
}

impl Default for Imputer {
    fn default() -> Self {
        Self {
            numeric: ImputeStrategy::Constant,
            categorical: ImputeStrategy::Constant,
            numeric_fill: 0.0,
            categorical_fill: "NA".to_string(),
        }
    }
}

impl Imputer {
    /// Median for numbers, mode for categories.
    pub fn median_mode() -> Self {
        Self {
            numeric: ImputeStrategy::Median,
            categorical: ImputeStrategy::MostFrequent,
            ..Self::default()
        }
    }

    /// Learn one fill value per column. Columns with nothing to learn from
    /// (all cells missing) get no fill.
    pub fn fit(&self, frame: &Frame) -> Result<FittedImputer, PrepError> {
        let mut fills = BTreeMap::new();
        for column in frame.columns() {
            let strategy = if column.kind().is_numeric() {
                self.numeric
            } else {
                self.categorical
            };
            if let Some(fill) = self.fill_for(column, strategy)? {
                fills.insert(column.name().to_string(), fill);
            }
        }
        Ok(FittedImputer { fills })
    }

    pub fn fit_transform(&self, frame: &Frame) -> Result<Frame, PrepError> {
        self.fit(frame)?.transform(frame)
    }

    fn fill_for(&self, column: &Column, strategy: ImputeStrategy) -> Result<Option<Value>, PrepError> {
        let fill = match (strategy, column.data()) {
            (ImputeStrategy::Constant, ColumnData::Float(_)) => Some(Value::Float(self.numeric_fill)),
            (ImputeStrategy::Constant, ColumnData::Int(_)) => {
                Some(Value::Int(self.numeric_fill.round() as i64))
            }
            (ImputeStrategy::Constant, _) => Some(Value::Text(self.categorical_fill.clone())),
            (ImputeStrategy::Median, ColumnData::Float(v)) => {
                median(v.iter().flatten().copied().filter(|x| !x.is_nan())).map(Value::Float)
            }
            (ImputeStrategy::Median, ColumnData::Int(v)) => {
                median(v.iter().flatten().map(|&x| x as f64)).map(|m| Value::Int(m.round() as i64))
            }
            (ImputeStrategy::Median, _) => {
                return Err(PrepError::UnsupportedStrategy {
                    strategy: strategy.to_string(),
                    kind: column.kind(),
                    column: column.name().to_string(),
                })
            }
            (ImputeStrategy::MostFrequent, ColumnData::Float(v)) => {
                float_mode(v.iter().flatten().copied().filter(|x| !x.is_nan())).map(Value::Float)
            }
            (ImputeStrategy::MostFrequent, ColumnData::Int(v)) => mode(v).map(Value::Int),
            (ImputeStrategy::MostFrequent, ColumnData::Bool(v)) => mode(v).map(Value::Bool),
            (ImputeStrategy::MostFrequent, ColumnData::Text(v)) => mode(v).map(Value::Text),
            (ImputeStrategy::MostFrequent, ColumnData::Timestamp(v)) => {
                mode(v).map(Value::Timestamp)
            }
        };
        // A constant has nothing to learn, but an all-missing column
        // still has no evidence for a statistic.
        if column.null_count() == column.len() && strategy != ImputeStrategy::Constant {
            return Ok(None);
        }
        Ok(fill)
    }
}

/// Fill values learned from a frame, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FittedImputer {
    fills: BTreeMap<String, Value>,
}

impl FittedImputer {
    pub fn fill(&self, column: &str) -> Option<&Value> {
        self.fills.get(column)
    }

    /// Fill missing cells. Columns unseen at fit time, or without a fill,
    /// pass through unchanged.
    pub fn transform(&self, frame: &Frame) -> Result<Frame, PrepError> {
        let mut columns = Vec::with_capacity(frame.n_cols());
        for column in frame.columns() {
            match self.fills.get(column.name()) {
                Some(fill) if column.null_count() > 0 => {
                    debug!(column = column.name(), fill = %fill, "imputing");
                    columns.push(fill_column(column, fill)?);
                }
                _ => columns.push(column.clone()),
            }
        }
        Ok(frame.with_columns(columns)?)
    }
}

/// Median imputation for numeric columns and most-frequent imputation for
/// categorical ones.
pub fn impute_median_mode(frame: &Frame) -> Result<Frame, PrepError> {
    Imputer::median_mode().fit_transform(frame)
}

fn fill_column(column: &Column, fill: &Value) -> Result<Column, PrepError> {
    fn fill_cells<T: Clone>(cells: &[Option<T>], value: &T) -> Vec<Option<T>> {
        cells
            .iter()
            .map(|c| Some(c.clone().unwrap_or_else(|| value.clone())))
            .collect()
    }

    let data = match (column.data(), fill) {
        (ColumnData::Float(v), Value::Float(f)) => ColumnData::Float(
            v.iter()
                .map(|c| Some(c.filter(|x| !x.is_nan()).unwrap_or(*f)))
                .collect(),
        ),
        (ColumnData::Int(v), Value::Int(f)) => ColumnData::Int(fill_cells(v, f)),
        (ColumnData::Bool(v), Value::Bool(f)) => ColumnData::Bool(fill_cells(v, f)),
        (ColumnData::Timestamp(v), Value::Timestamp(f)) => ColumnData::Timestamp(fill_cells(v, f)),
        (ColumnData::Text(v), Value::Text(f)) => ColumnData::Text(fill_cells(v, f)),
        // A text constant turns any categorical column into text labels.
        (_, Value::Text(f)) if column.kind() == ColumnKind::Category => ColumnData::Text(
            column
                .labels()
                .into_iter()
                .map(|l| Some(l.unwrap_or_else(|| f.clone())))
                .collect(),
        ),
        _ => {
            return Err(PrepError::FillTypeMismatch {
                column: column.name().to_string(),
                fill: format!("{:?}", fill),
            })
        }
    };
    Ok(Column::new(column.name(), data))
}

/// Median of the values, `None` when there are none.
pub fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

fn mode<T: Ord + Clone>(cells: &[Option<T>]) -> Option<T> {
    let mut counts: BTreeMap<&T, usize> = BTreeMap::new();
    for value in cells.iter().flatten() {
        *counts.entry(value).or_default() += 1;
    }
    let mut best: Option<(&T, usize)> = None;
    // Ascending order plus a strict comparison keeps the smallest on ties.
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.clone())
}

fn float_mode(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if best.map_or(true, |(_, c)| j - i > c) {
            best = Some((sorted[i], j - i));
        }
        i = j;
    }
    best.map(|(v, _)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median([3.0, 1.0, 2.0].into_iter()), Some(2.0));
        assert_eq!(median([4.0, 1.0, 2.0, 3.0].into_iter()), Some(2.5));
        assert_eq!(median(std::iter::empty()), None);
    }

    #[test]
    fn test_integer_median_rounds() {
        let frame = Frame::new(vec![Column::int_opt(
            "n",
            vec![Some(1), Some(2), None, Some(4), Some(5)],
        )])
        .unwrap();
        let out = impute_median_mode(&frame).unwrap();
        // median of 1,2,4,5 is 3.0
        assert_eq!(out.column("n").unwrap().get(2), Value::Int(3));

        let frame = Frame::new(vec![Column::int_opt("n", vec![Some(1), Some(2), None])]).unwrap();
        let out = impute_median_mode(&frame).unwrap();
        assert_eq!(out.column("n").unwrap().get(2), Value::Int(2));
    }

    #[test]
    fn test_mode_tie_goes_to_smallest() {
        let frame = Frame::new(vec![Column::text_opt(
            "c",
            vec![Some("b".into()), Some("a".into()), None],
        )])
        .unwrap();
        let out = impute_median_mode(&frame).unwrap();
        assert_eq!(out.column("c").unwrap().label(2), Some("a".into()));
    }

    #[test]
    fn test_complete_column_untouched() {
        let frame = Frame::new(vec![Column::float("x", vec![1.0, 5.0])]).unwrap();
        assert_eq!(impute_median_mode(&frame).unwrap(), frame);
    }

    #[test]
    fn test_all_missing_stays_missing() {
        let frame = Frame::new(vec![Column::float_opt("x", vec![None, None])]).unwrap();
        let out = impute_median_mode(&frame).unwrap();
        assert_eq!(out.column("x").unwrap().null_count(), 2);
    }

    #[test]
    fn test_default_constants() {
        let frame = Frame::new(vec![
            Column::float_opt("x", vec![None, Some(2.0)]),
            Column::bool("b", vec![true, false]),
            Column::new("flag", ColumnData::Bool(vec![None, Some(true)])),
        ])
        .unwrap();
        let out = Imputer::default().fit_transform(&frame).unwrap();
        assert_eq!(out.column("x").unwrap().f64_at(0), Some(0.0));
        let flag = out.column("flag").unwrap();
        assert_eq!(flag.label(0), Some("NA".into()));
        assert_eq!(flag.label(1), Some("true".into()));
        // Complete columns keep their storage.
        assert!(matches!(out.column("b").unwrap().data(), ColumnData::Bool(_)));
    }

    #[test]
    fn test_median_rejected_for_categories() {
        let imputer = Imputer {
            categorical: ImputeStrategy::Median,
            ..Imputer::default()
        };
        let frame = Frame::new(vec![Column::text("c", ["a"])]).unwrap();
        assert!(matches!(
            imputer.fit(&frame),
            Err(PrepError::UnsupportedStrategy { .. })
        ));
    }

    #[test]
    fn test_fitted_fills_reused_on_new_rows() {
        let train = Frame::new(vec![Column::float("x", vec![1.0, 2.0, 3.0])]).unwrap();
        let fitted = Imputer::median_mode().fit(&train).unwrap();
        let test = Frame::new(vec![Column::float_opt("x", vec![None])]).unwrap();
        let out = fitted.transform(&test).unwrap();
        assert_eq!(out.column("x").unwrap().f64_at(0), Some(2.0));
    }

    #[test]
    fn test_float_mode() {
        assert_eq!(float_mode([2.0, 1.0, 2.0, 1.0].into_iter()), Some(1.0));
        assert_eq!(float_mode([3.0, 3.0, 1.0].into_iter()), Some(3.0));
    }
}
