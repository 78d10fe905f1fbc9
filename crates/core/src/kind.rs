//! Column-kind classification.
//!
//! Every column is tagged exactly once, when it is constructed. Downstream
//! components read the tag instead of re-inspecting cells, so two callers
//! can never disagree about whether a column is numeric.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frame::ColumnData;

/// The modelling kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Floating point measurements.
    Numeric,
    /// Whole-number measurements.
    Integer,
    /// Anything that is modelled as discrete levels.
    Category,
}

impl ColumnKind {
    /// `Numeric` and `Integer` are both treated as continuous by the learners.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Numeric | ColumnKind::Integer)
    }

    pub fn is_category(self) -> bool {
        self == ColumnKind::Category
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Integer => "integer",
            ColumnKind::Category => "category",
        };
        write!(f, "{}", name)
    }
}

/// Classify a column's storage into a modelling kind.
///
/// Floats are `Numeric` and integers are `Integer`. Text, booleans and
/// timestamps all land in the `Category` bucket.
///
/// ```rust
/// use causeway_core::{classify, ColumnData, ColumnKind};
///
/// let flags = ColumnData::Bool(vec![Some(true), None]);
/// assert_eq!(classify(&flags), ColumnKind::Category);
/// ```
pub fn classify(data: &ColumnData) -> ColumnKind {
    match data {
        ColumnData::Float(_) => ColumnKind::Numeric,
        ColumnData::Int(_) => ColumnKind::Integer,
        ColumnData::Text(_) | ColumnData::Bool(_) | ColumnData::Timestamp(_) => {
            ColumnKind::Category
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_storage() {
        assert_eq!(
            classify(&ColumnData::Float(vec![Some(1.0)])),
            ColumnKind::Numeric
        );
        assert_eq!(classify(&ColumnData::Int(vec![None])), ColumnKind::Integer);
    }

    #[test]
    fn test_default_bucket_is_category() {
        assert_eq!(
            classify(&ColumnData::Timestamp(vec![Some(0)])),
            ColumnKind::Category
        );
        assert_eq!(
            classify(&ColumnData::Text(vec![Some("a".into())])),
            ColumnKind::Category
        );
    }

    #[test]
    fn test_is_numeric() {
        assert!(ColumnKind::Integer.is_numeric());
        assert!(!ColumnKind::Category.is_numeric());
    }
}
