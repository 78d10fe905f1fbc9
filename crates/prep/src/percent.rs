//! Percentage-string parsing.
//!
//! A text column such as `["5%", " 12.5 % ", "n/a"]` becomes a float
//! column once at least half of its present cells look like percentages.

use causeway_core::{Column, ColumnData, Frame};
use regex::Regex;
use tracing::debug;

use crate::error::PrepError;

/// Cells matching this (surrounding spaces and tabs allowed) are percentages.
pub const PERCENTAGE_PATTERN: &str = r"^[ \t]*(\d+(?:\.\d+)?)[ \t]*%[ \t]*$";

/// Compiled percentage matcher.
#[derive(Debug, Clone)]
pub struct PercentageParser {
    pattern: Regex,
}

impl PercentageParser {
    pub fn new() -> Result<Self, PrepError> {
        Ok(Self {
            pattern: Regex::new(PERCENTAGE_PATTERN)?,
        })
    }

    /// The numeric part of a percentage cell.
    pub fn parse_cell(&self, cell: &str) -> Option<f64> {
        let caps = self.pattern.captures(cell)?;
        caps.get(1)?.as_str().parse().ok()
    }

    /// Convert one column, or return `None` when it stays as it is.
    ///
    /// Only text columns are candidates. The column converts when the
    /// matched cells are at least half of the non-missing cells.
    pub fn parse_column(&self, column: &Column) -> Option<Column> {
        let ColumnData::Text(cells) = column.data() else {
            return None;
        };
        let parsed: Vec<Option<f64>> = cells
            .iter()
            .map(|c| c.as_deref().and_then(|s| self.parse_cell(s)))
            .collect();
        let present = cells.iter().filter(|c| c.is_some()).count();
        let matched = parsed.iter().filter(|p| p.is_some()).count();
        if present == 0 || matched * 2 < present {
            return None;
        }
        debug!(column = column.name(), matched, present, "parsed percentages");
        Some(Column::float_opt(column.name(), parsed))
    }

    pub fn transform(&self, frame: &Frame) -> Result<Frame, PrepError> {
        let columns = frame
            .columns()
            .iter()
            .map(|c| self.parse_column(c).unwrap_or_else(|| c.clone()))
            .collect();
        Ok(frame.with_columns(columns)?)
    }
}

/// Parse percentage strings in every text column of `frame`.
pub fn parse_percentages(frame: &Frame) -> Result<Frame, PrepError> {
    PercentageParser::new()?.transform(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_patterns() {
        let p = PercentageParser::new().unwrap();
        assert_eq!(p.parse_cell("5%"), Some(5.0));
        assert_eq!(p.parse_cell(" 12.5 %\t"), Some(12.5));
        assert_eq!(p.parse_cell("-5%"), None);
        assert_eq!(p.parse_cell("5"), None);
        assert_eq!(p.parse_cell("5%%"), None);
        assert_eq!(p.parse_cell(".5%"), None);
    }

    #[test]
    fn test_majority_converts() {
        let frame = Frame::new(vec![Column::text("p", ["5%", "10%", "abc"])]).unwrap();
        let out = parse_percentages(&frame).unwrap();
        let col = out.column("p").unwrap();
        assert_eq!(col.f64_at(0), Some(5.0));
        assert_eq!(col.f64_at(1), Some(10.0));
        assert!(col.is_missing(2));
    }

    #[test]
    fn test_minority_untouched() {
        let frame = Frame::new(vec![Column::text("p", ["5%", "abc", "def"])]).unwrap();
        assert_eq!(parse_percentages(&frame).unwrap(), frame);
    }

    #[test]
    fn test_threshold_counts_present_cells_only() {
        let frame = Frame::new(vec![Column::text_opt(
            "p",
            vec![Some("5%".into()), None, None, Some("x".into())],
        )])
        .unwrap();
        let out = parse_percentages(&frame).unwrap();
        assert_eq!(out.column("p").unwrap().f64_at(0), Some(5.0));
    }

    #[test]
    fn test_non_text_and_all_missing_untouched() {
        let frame = Frame::new(vec![
            Column::float("x", vec![1.0, 2.0]),
            Column::text_opt("t", vec![None, None]),
        ])
        .unwrap();
        assert_eq!(parse_percentages(&frame).unwrap(), frame);
    }
}
