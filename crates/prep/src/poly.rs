//! # Polynomial and Categorical Expansion
//!
//! Numeric features expand into every monomial up to a degree; categorical
//! features expand into one dummy per level. Output columns are named the
//! way a reader would write the term:
//!
//! | Term | Name |
//! |------|------|
//! | a | `a` |
//! | a² | `a^2` |
//! | a·b | `a b` |
//! | a²·b | `a^2 b` |
//! | colour = red | `colour_red` |
//!
//! ```rust
//! use causeway_core::{Column, Frame};
//! use causeway_prep::expand_polynomial_categorical;
//!
//! let frame = Frame::new(vec![
//!     Column::float("a", vec![1.0, 2.0]),
//!     Column::float("b", vec![3.0, 4.0]),
//! ]).unwrap();
//!
//! let out = expand_polynomial_categorical(&frame, 2, false).unwrap();
//! assert_eq!(out.frame.column_names(), vec!["a", "b", "a^2", "a b", "b^2"]);
//! assert_eq!(out.frame.column("a b").unwrap().f64_at(1), Some(8.0));
//! ```

use causeway_core::{Column, Frame};
use tracing::debug;

use crate::error::PrepError;
use crate::onehot::OneHotEncoder;

/// Result of [`expand_polynomial_categorical`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialExpansion {
    /// All expanded features, as float columns.
    pub frame: Frame,
    /// Degree-1 numeric names followed by dummy names.
    pub base_columns: Vec<String>,
    /// Numeric source columns, in input order.
    pub numeric_columns: Vec<String>,
}

/// Name of the monomial with the given per-feature exponents.
pub fn monomial_name(names: &[String], exponents: &[usize]) -> String {
    names
        .iter()
        .zip(exponents)
        .filter(|(_, &e)| e > 0)
        .map(|(n, &e)| if e == 1 { n.clone() } else { format!("{}^{}", n, e) })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exponent vectors of all monomials of total degree `1..=degree` over
/// `n` features, lowest degree first and lexicographic within a degree.
fn monomials(n: usize, degree: usize) -> Vec<Vec<usize>> {
    fn combos(n: usize, len: usize, start: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == len {
            let mut exps = vec![0; n];
            for &i in current.iter() {
                exps[i] += 1;
            }
            out.push(exps);
            return;
        }
        for i in start..n {
            current.push(i);
            combos(n, len, i, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    for d in 1..=degree {
        combos(n, d, 0, &mut Vec::with_capacity(d), &mut out);
    }
    out
}

/// Expand numeric columns polynomially and categorical columns into
/// dummies. A monomial is missing when any of its factors is; a missing
/// categorical cell gives zeros in every dummy.
///
/// With `normalize`, every output column is centred and scaled to unit
/// variance over its present cells.
pub fn expand_polynomial_categorical(
    frame: &Frame,
    degree: usize,
    normalize: bool,
) -> Result<PolynomialExpansion, PrepError> {
    if degree == 0 {
        return Err(PrepError::InvalidDegree(degree));
    }
    let (numeric, categorical) = frame.partition_kinds();
    let values: Vec<Vec<Option<f64>>> = numeric
        .iter()
        .map(|n| -> Result<Vec<Option<f64>>, PrepError> {
            let column = frame.column(n)?;
            Ok((0..column.len()).map(|r| column.f64_at(r)).collect())
        })
        .collect::<Result<_, _>>()?;

    let n_rows = frame.n_rows();
    let mut columns = Vec::new();
    for exps in monomials(numeric.len(), degree) {
        let cells = (0..n_rows)
            .map(|r| {
                exps.iter()
                    .enumerate()
                    .filter(|(_, &e)| e > 0)
                    .try_fold(1.0, |acc, (j, &e)| values[j][r].map(|v| acc * v.powi(e as i32)))
            })
            .collect();
        columns.push(Column::float_opt(monomial_name(&numeric, &exps), cells));
    }

    let mut base_columns = numeric.clone();
    for name in &categorical {
        let encoder = OneHotEncoder::fit(frame.column(name)?);
        let dummies = encoder.transform(frame.column(name)?);
        for (j, dummy) in encoder.feature_names().into_iter().enumerate() {
            base_columns.push(dummy.clone());
            columns.push(Column::float(dummy, dummies.column(j)));
        }
    }

    if normalize {
        columns = columns.into_iter().map(|c| standardize(&c)).collect();
    }
    debug!(
        numeric = numeric.len(),
        categorical = categorical.len(),
        expanded = columns.len(),
        degree,
        "expanded features"
    );
    Ok(PolynomialExpansion {
        frame: frame.with_columns(columns)?,
        base_columns,
        numeric_columns: numeric,
    })
}

/// Centre and scale a numeric column. A constant column is only centred.
pub fn standardize(column: &Column) -> Column {
    let cells: Vec<Option<f64>> = (0..column.len()).map(|r| column.f64_at(r)).collect();
    let present: Vec<f64> = cells.iter().flatten().copied().collect();
    if present.is_empty() {
        return column.clone();
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let scale = if var > 0.0 { var.sqrt() } else { 1.0 };
    Column::float_opt(
        column.name(),
        cells.into_iter().map(|c| c.map(|v| (v - mean) / scale)).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monomial_count() {
        // 2 features, degree 3: 2 + 3 + 4
        assert_eq!(monomials(2, 3).len(), 9);
        assert_eq!(monomials(0, 3).len(), 0);
    }

    #[test]
    fn test_names() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(monomial_name(&names, &[2, 1]), "a^2 b");
        assert_eq!(monomial_name(&names, &[0, 1]), "b");
    }

    #[test]
    fn test_categorical_dummies_and_base_columns() {
        let frame = Frame::new(vec![
            Column::float("x", vec![1.0, 2.0, 3.0]),
            Column::text_opt("c", vec![Some("u".into()), Some("v".into()), None]),
        ])
        .unwrap();
        let out = expand_polynomial_categorical(&frame, 2, false).unwrap();
        assert_eq!(out.frame.column_names(), vec!["x", "x^2", "c_u", "c_v"]);
        assert_eq!(out.base_columns, vec!["x", "c_u", "c_v"]);
        assert_eq!(out.frame.column("c_v").unwrap().f64_at(2), Some(0.0));
        assert_eq!(out.frame.column("x^2").unwrap().f64_at(2), Some(9.0));
    }

    #[test]
    fn test_missing_factor_propagates() {
        let frame = Frame::new(vec![
            Column::float_opt("a", vec![Some(2.0), None]),
            Column::float("b", vec![1.0, 1.0]),
        ])
        .unwrap();
        let out = expand_polynomial_categorical(&frame, 2, false).unwrap();
        assert!(out.frame.column("a b").unwrap().is_missing(1));
        assert_eq!(out.frame.column("b^2").unwrap().f64_at(1), Some(1.0));
    }

    #[test]
    fn test_normalize() {
        let frame = Frame::new(vec![Column::float("x", vec![1.0, 2.0, 3.0])]).unwrap();
        let out = expand_polynomial_categorical(&frame, 1, true).unwrap();
        let x = out.frame.column("x").unwrap();
        assert!((x.f64_at(1).unwrap()).abs() < 1e-12);
        let var: f64 = (0..3).map(|r| x.f64_at(r).unwrap().powi(2)).sum::<f64>() / 3.0;
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_degree_rejected() {
        let frame = Frame::new(vec![Column::float("x", vec![1.0])]).unwrap();
        assert_eq!(
            expand_polynomial_categorical(&frame, 0, false).unwrap_err(),
            PrepError::InvalidDegree(0)
        );
    }
}
