//! # Frames
//!
//! A `Frame` is a set of named, equal-length columns. Each column stores
//! typed cells, where any cell may be missing, and carries the
//! [`ColumnKind`] it was classified as when it was built.
//!
//! ```rust
//! use causeway_core::{Column, ColumnKind, Frame};
//!
//! let frame = Frame::new(vec![
//!     Column::float("price", vec![1.5, 2.0, 3.25]),
//!     Column::text("colour", ["red", "blue", "red"]),
//! ]).unwrap();
//!
//! assert_eq!(frame.n_rows(), 3);
//! assert_eq!(frame.column("colour").unwrap().kind(), ColumnKind::Category);
//! ```

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::kind::{classify, ColumnKind};

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
    Timestamp(i64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell. Text and missing cells have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Timestamp(t) => Some(*t as f64),
            Value::Text(_) | Value::Null => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v),
        }
    }
}

/// Typed column storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    Timestamp(Vec<Option<i64>>),
}

fn pick<T: Clone>(values: &[Option<T>], rows: &[usize]) -> Vec<Option<T>> {
    rows.iter().map(|&r| values[r].clone()).collect()
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A cell is missing when it is `None`, or a NaN float.
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Float(v) => v[row].map_or(true, |x| x.is_nan()),
            ColumnData::Int(v) => v[row].is_none(),
            ColumnData::Bool(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
            ColumnData::Timestamp(v) => v[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&r| self.is_missing(r)).count()
    }

    pub fn get(&self, row: usize) -> Value {
        if self.is_missing(row) {
            return Value::Null;
        }
        match self {
            ColumnData::Float(v) => v[row].map_or(Value::Null, Value::Float),
            ColumnData::Int(v) => v[row].map_or(Value::Null, Value::Int),
            ColumnData::Bool(v) => v[row].map_or(Value::Null, Value::Bool),
            ColumnData::Text(v) => v[row].clone().map_or(Value::Null, Value::Text),
            ColumnData::Timestamp(v) => v[row].map_or(Value::Null, Value::Timestamp),
        }
    }

    /// Gather the given rows, in order. Indices may repeat.
    pub fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Float(v) => ColumnData::Float(pick(v, rows)),
            ColumnData::Int(v) => ColumnData::Int(pick(v, rows)),
            ColumnData::Bool(v) => ColumnData::Bool(pick(v, rows)),
            ColumnData::Text(v) => ColumnData::Text(pick(v, rows)),
            ColumnData::Timestamp(v) => ColumnData::Timestamp(pick(v, rows)),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ColumnRepr {
    name: String,
    data: ColumnData,
}

/// A named column with its kind fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColumnRepr", into = "ColumnRepr")]
pub struct Column {
    name: String,
    kind: ColumnKind,
    data: ColumnData,
}

impl From<ColumnRepr> for Column {
    fn from(repr: ColumnRepr) -> Self {
        Column::new(repr.name, repr.data)
    }
}

impl From<Column> for ColumnRepr {
    fn from(column: Column) -> Self {
        ColumnRepr {
            name: column.name,
            data: column.data,
        }
    }
}

impl Column {
    /// Build a column and classify it.
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        let kind = classify(&data);
        Self {
            name: name.into(),
            kind,
            data,
        }
    }

    /// Dense floats. NaN cells are stored as missing.
    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        let cells = values
            .into_iter()
            .map(|v| if v.is_nan() { None } else { Some(v) })
            .collect();
        Self::new(name, ColumnData::Float(cells))
    }

    pub fn float_opt(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Float(values))
    }

    pub fn int(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, ColumnData::Int(values.into_iter().map(Some).collect()))
    }

    pub fn int_opt(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        Self::new(name, ColumnData::Int(values))
    }

    pub fn bool(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self::new(name, ColumnData::Bool(values.into_iter().map(Some).collect()))
    }

    pub fn text<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let cells = values.into_iter().map(|s| Some(s.into())).collect();
        Self::new(name, ColumnData::Text(cells))
    }

    pub fn text_opt(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, ColumnData::Text(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn into_data(self) -> ColumnData {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_missing(&self, row: usize) -> bool {
        self.data.is_missing(row)
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    pub fn get(&self, row: usize) -> Value {
        self.data.get(row)
    }

    /// Numeric cell value, if the cell is present and has a numeric view.
    pub fn f64_at(&self, row: usize) -> Option<f64> {
        self.data.get(row).as_f64()
    }

    /// String label of a cell, used when the column is modelled as levels.
    pub fn label(&self, row: usize) -> Option<String> {
        match self.data.get(row) {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn labels(&self) -> Vec<Option<String>> {
        (0..self.len()).map(|r| self.label(r)).collect()
    }

    /// Numeric cells for `Numeric`/`Integer` columns; `None` for categories.
    pub fn numeric_values(&self) -> Option<Vec<Option<f64>>> {
        if !self.kind.is_numeric() {
            return None;
        }
        Some((0..self.len()).map(|r| self.f64_at(r)).collect())
    }

    /// Sorted distinct labels of the present cells.
    pub fn distinct_labels(&self) -> Vec<String> {
        let set: BTreeSet<String> = (0..self.len()).filter_map(|r| self.label(r)).collect();
        set.into_iter().collect()
    }

    pub fn n_unique(&self) -> usize {
        self.distinct_labels().len()
    }

    pub fn take(&self, rows: &[usize]) -> Column {
        Column::new(self.name.clone(), self.data.take(rows))
    }

    pub fn renamed(&self, name: impl Into<String>) -> Column {
        Column::new(name, self.data.clone())
    }
}

/// An ordered collection of equal-length, uniquely named columns.
///
/// The row count is stored, so a frame projected onto no columns still
/// knows how many rows it has.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Frame {
    /// Build a frame, checking that names are unique and lengths agree.
    pub fn new(columns: Vec<Column>) -> Result<Self, CoreError> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        Self::from_parts(n_rows, columns)
    }

    /// Build a frame with an explicit row count, which every column must
    /// match.
    pub fn from_parts(n_rows: usize, columns: Vec<Column>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        let expected = n_rows;
        for column in &columns {
            if !seen.insert(column.name().to_string()) {
                return Err(CoreError::DuplicateColumn {
                    name: column.name().to_string(),
                });
            }
            if column.len() != expected {
                return Err(CoreError::LengthMismatch {
                    name: column.name().to_string(),
                    expected,
                    got: column.len(),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A frame with `n_rows` rows and no columns.
    pub fn with_rows(n_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            n_rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, CoreError> {
        self.get(name).ok_or_else(|| CoreError::missing(name))
    }

    /// Names from `names` that are not columns of this frame.
    pub fn missing_columns<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        names
            .iter()
            .map(AsRef::as_ref)
            .filter(|n| !self.has_column(n))
            .map(str::to_string)
            .collect()
    }

    /// Project onto the named columns, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Frame, CoreError> {
        let columns = names
            .iter()
            .map(|n| self.column(n.as_ref()).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Frame::from_parts(self.n_rows, columns)
    }

    pub fn take_rows(&self, rows: &[usize]) -> Frame {
        Frame {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            n_rows: rows.len(),
        }
    }

    /// Append a column. The first column of a zero-row frame sets the
    /// length.
    pub fn push_column(&mut self, column: Column) -> Result<(), CoreError> {
        if self.has_column(column.name()) {
            return Err(CoreError::DuplicateColumn {
                name: column.name().to_string(),
            });
        }
        if self.columns.is_empty() && self.n_rows == 0 {
            self.n_rows = column.len();
        } else if column.len() != self.n_rows {
            return Err(CoreError::LengthMismatch {
                name: column.name().to_string(),
                expected: self.n_rows(),
                got: column.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Same rows, new columns.
    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Frame, CoreError> {
        Frame::from_parts(self.n_rows, columns)
    }

    /// Swap in a column with the same name, keeping its position.
    pub fn replace_column(&mut self, column: Column) -> Result<(), CoreError> {
        if column.len() != self.n_rows() {
            return Err(CoreError::LengthMismatch {
                name: column.name().to_string(),
                expected: self.n_rows(),
                got: column.len(),
            });
        }
        let slot = self
            .columns
            .iter_mut()
            .find(|c| c.name() == column.name())
            .ok_or_else(|| CoreError::missing(column.name()))?;
        *slot = column;
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name() == name)?;
        Some(self.columns.remove(idx))
    }

    /// Column names split into (numeric-like, categorical).
    pub fn partition_kinds(&self) -> (Vec<String>, Vec<String>) {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for column in &self.columns {
            if column.kind().is_numeric() {
                numeric.push(column.name().to_string());
            } else {
                categorical.push(column.name().to_string());
            }
        }
        (numeric, categorical)
    }

    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.get(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::new(vec![
            Column::float("x", vec![1.0, 2.0, 3.0]),
            Column::int("n", vec![4, 5, 6]),
            Column::text("c", ["a", "b", "a"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = Frame::new(vec![
            Column::float("x", vec![1.0, 2.0]),
            Column::float("y", vec![1.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::LengthMismatch { .. }));
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = Frame::new(vec![
            Column::float("x", vec![1.0]),
            Column::float("x", vec![2.0]),
        ])
        .unwrap_err();
        assert_eq!(err, CoreError::DuplicateColumn { name: "x".into() });
    }

    #[test]
    fn test_partition_kinds() {
        let (numeric, categorical) = sample().partition_kinds();
        assert_eq!(numeric, vec!["x", "n"]);
        assert_eq!(categorical, vec!["c"]);
    }

    #[test]
    fn test_nan_is_missing() {
        let c = Column::float("x", vec![1.0, f64::NAN]);
        assert_eq!(c.null_count(), 1);
        assert_eq!(c.get(1), Value::Null);
    }

    #[test]
    fn test_take_rows_keeps_order() {
        let taken = sample().take_rows(&[2, 0]);
        assert_eq!(taken.column("x").unwrap().f64_at(0), Some(3.0));
        assert_eq!(taken.column("c").unwrap().label(1), Some("a".into()));
    }

    #[test]
    fn test_distinct_labels_sorted() {
        let c = Column::text("c", ["b", "a", "b"]);
        assert_eq!(c.distinct_labels(), vec!["a", "b"]);
        assert_eq!(c.n_unique(), 2);
    }

    #[test]
    fn test_select_missing_column() {
        let err = sample().select(&["x", "nope"]).unwrap_err();
        assert_eq!(err, CoreError::missing("nope"));
    }

    #[test]
    fn test_empty_projection_keeps_rows() {
        let none: [&str; 0] = [];
        let projected = sample().select(&none).unwrap();
        assert_eq!(projected.n_cols(), 0);
        assert_eq!(projected.n_rows(), 3);
        assert_eq!(sample().take_rows(&[0, 1]).select(&none).unwrap().n_rows(), 2);
    }

    #[test]
    fn test_push_into_sized_frame() {
        let mut frame = Frame::with_rows(2);
        assert!(frame.push_column(Column::float("x", vec![1.0])).is_err());
        frame.push_column(Column::float("x", vec![1.0, 2.0])).unwrap();
        assert_eq!(frame.n_rows(), 2);
    }

    #[test]
    fn test_replace_column_keeps_position() {
        let mut frame = sample();
        frame
            .replace_column(Column::float("n", vec![0.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(frame.column_names(), vec!["x", "n", "c"]);
        assert_eq!(frame.column("n").unwrap().kind(), ColumnKind::Numeric);
    }
}
