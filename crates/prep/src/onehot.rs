//! One-hot encoding of categorical columns.

use causeway_core::{Column, Matrix};
use serde::{Deserialize, Serialize};

/// Levels learned from a column, in sorted order.
///
/// Encoding a label that was not seen at fit time, or a missing cell,
/// yields an all-zero row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    column: String,
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit(column: &Column) -> Self {
        Self {
            column: column.name().to_string(),
            categories: column.distinct_labels(),
        }
    }

    pub fn from_categories(column: impl Into<String>, mut categories: Vec<String>) -> Self {
        categories.sort();
        categories.dedup();
        Self {
            column: column.into(),
            categories,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    /// `<column>_<level>` for each level.
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }

    pub fn encode_labels(&self, labels: &[Option<String>]) -> Matrix {
        let mut m = Matrix::zeros(labels.len(), self.categories.len());
        for (i, label) in labels.iter().enumerate() {
            if let Some(j) = label.as_deref().and_then(|l| self.index_of(l)) {
                m.set(i, j, 1.0);
            }
        }
        m
    }

    pub fn transform(&self, column: &Column) -> Matrix {
        self.encode_labels(&column.labels())
    }

    /// Arg-max per row. A row with no positive entry decodes to `None`.
    pub fn inverse_transform(&self, encoded: &Matrix) -> Vec<Option<String>> {
        (0..encoded.rows())
            .map(|i| {
                let row = encoded.row(i);
                let mut best: Option<(usize, f64)> = None;
                for (j, &v) in row.iter().enumerate().take(self.categories.len()) {
                    if v > 0.0 && best.map_or(true, |(_, b)| v > b) {
                        best = Some((j, v));
                    }
                }
                best.map(|(j, _)| self.categories[j].clone())
            })
            .collect()
    }
}
