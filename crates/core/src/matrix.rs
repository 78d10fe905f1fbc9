//! # Dense Matrices
//!
//! `Matrix` is a row-major `f64` matrix with the small amount of linear
//! algebra the learners need: products, Gram matrices and Cholesky solves
//! for symmetric positive-definite systems.
//!
//! | Op | Result |
//! |----|--------|
//! | `a.matmul(&b)` | A @ B |
//! | `a.gram()` | Aᵀ A |
//! | `a.t_matvec(v)` | Aᵀ v |
//! | `a.solve_spd(b)` | x with A x = b |
//!
//! Zero-column matrices are valid: a learner with no features sees an
//! `n x 0` design and fits only its intercept.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A dense row-major matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::full(rows, cols, 0.0)
    }

    pub fn full(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Build from flattened row-major data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, CoreError> {
        if data.len() != rows * cols {
            return Err(CoreError::ShapeMismatch {
                expected: format!("{} values", rows * cols),
                got: format!("{} values", data.len()),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows. An empty input gives a `0 x 0` matrix.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, CoreError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(CoreError::RaggedRows);
        }
        let n = rows.len();
        Ok(Self {
            rows: n,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// A single-column matrix.
    pub fn column_vector(values: Vec<f64>) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values,
        }
    }

    /// Build column by column. All columns must share a length, which is
    /// `rows` when `columns` is empty.
    pub fn from_columns(rows: usize, columns: &[Vec<f64>]) -> Result<Self, CoreError> {
        let mut m = Self::zeros(rows, columns.len());
        for (j, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(CoreError::shape((rows, 1), (column.len(), 1)));
            }
            for (i, &v) in column.iter().enumerate() {
                m.set(i, j, v);
            }
        }
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, j)).collect()
    }

    pub fn transpose(&self) -> Matrix {
        let mut t = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                t.set(j, i, self.get(i, j));
            }
        }
        t
    }

    pub fn matmul(&self, other: &Matrix) -> Result<Matrix, CoreError> {
        if self.cols != other.rows {
            return Err(CoreError::shape(
                (self.cols, other.cols),
                (other.rows, other.cols),
            ));
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    out.data[i * other.cols + j] += a * other.get(k, j);
                }
            }
        }
        Ok(out)
    }

    /// A v
    pub fn matvec(&self, v: &[f64]) -> Result<Vec<f64>, CoreError> {
        if v.len() != self.cols {
            return Err(CoreError::shape((self.cols, 1), (v.len(), 1)));
        }
        Ok((0..self.rows)
            .map(|i| self.row(i).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Aᵀ v
    pub fn t_matvec(&self, v: &[f64]) -> Result<Vec<f64>, CoreError> {
        if v.len() != self.rows {
            return Err(CoreError::shape((self.rows, 1), (v.len(), 1)));
        }
        let mut out = vec![0.0; self.cols];
        for (i, &vi) in v.iter().enumerate() {
            for (j, o) in out.iter_mut().enumerate() {
                *o += self.get(i, j) * vi;
            }
        }
        Ok(out)
    }

    /// Aᵀ A
    pub fn gram(&self) -> Matrix {
        let mut g = Matrix::zeros(self.cols, self.cols);
        for i in 0..self.rows {
            let row = self.row(i);
            for a in 0..self.cols {
                for b in a..self.cols {
                    g.data[a * self.cols + b] += row[a] * row[b];
                }
            }
        }
        g.mirror_upper();
        g
    }

    /// Aᵀ diag(w) A
    pub fn weighted_gram(&self, weights: &[f64]) -> Result<Matrix, CoreError> {
        if weights.len() != self.rows {
            return Err(CoreError::shape((self.rows, 1), (weights.len(), 1)));
        }
        let mut g = Matrix::zeros(self.cols, self.cols);
        for (i, &w) in weights.iter().enumerate() {
            let row = self.row(i);
            for a in 0..self.cols {
                for b in a..self.cols {
                    g.data[a * self.cols + b] += w * row[a] * row[b];
                }
            }
        }
        g.mirror_upper();
        Ok(g)
    }

    fn mirror_upper(&mut self) {
        for a in 0..self.cols {
            for b in 0..a {
                self.data[a * self.cols + b] = self.data[b * self.cols + a];
            }
        }
    }

    pub fn add_diagonal(&mut self, value: f64) {
        for i in 0..self.rows.min(self.cols) {
            self.data[i * self.cols + i] += value;
        }
    }

    pub fn trace(&self) -> f64 {
        (0..self.rows.min(self.cols)).map(|i| self.get(i, i)).sum()
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.rows.min(self.cols)).map(|i| self.get(i, i)).collect()
    }

    /// Element-wise A + B.
    pub fn add(&self, other: &Matrix) -> Result<Matrix, CoreError> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Element-wise A - B.
    pub fn sub(&self, other: &Matrix) -> Result<Matrix, CoreError> {
        self.zip_with(other, |a, b| a - b)
    }

    fn zip_with(&self, other: &Matrix, f: impl Fn(f64, f64) -> f64) -> Result<Matrix, CoreError> {
        if self.shape() != other.shape() {
            return Err(CoreError::shape(self.shape(), other.shape()));
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn scale(&self, factor: f64) -> Matrix {
        self.map(|v| v * factor)
    }

    /// Columns of `self` followed by columns of `other`.
    pub fn hstack(&self, other: &Matrix) -> Result<Matrix, CoreError> {
        if self.rows != other.rows {
            return Err(CoreError::shape(
                (self.rows, other.cols),
                (other.rows, other.cols),
            ));
        }
        let cols = self.cols + other.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for i in 0..self.rows {
            data.extend_from_slice(self.row(i));
            data.extend_from_slice(other.row(i));
        }
        Ok(Matrix {
            rows: self.rows,
            cols,
            data,
        })
    }

    /// Prepend a column of ones.
    pub fn with_intercept(&self) -> Matrix {
        let cols = self.cols + 1;
        let mut data = Vec::with_capacity(self.rows * cols);
        for i in 0..self.rows {
            data.push(1.0);
            data.extend_from_slice(self.row(i));
        }
        Matrix {
            rows: self.rows,
            cols,
            data,
        }
    }

    pub fn select_rows(&self, rows: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(rows.len() * self.cols);
        for &r in rows {
            data.extend_from_slice(self.row(r));
        }
        Matrix {
            rows: rows.len(),
            cols: self.cols,
            data,
        }
    }

    pub fn select_columns(&self, cols: &[usize]) -> Matrix {
        let mut out = Matrix::zeros(self.rows, cols.len());
        for i in 0..self.rows {
            for (k, &j) in cols.iter().enumerate() {
                out.set(i, k, self.get(i, j));
            }
        }
        out
    }

    pub fn column_means(&self) -> Vec<f64> {
        if self.rows == 0 {
            return vec![0.0; self.cols];
        }
        let mut sums = vec![0.0; self.cols];
        for i in 0..self.rows {
            for (s, v) in sums.iter_mut().zip(self.row(i)) {
                *s += v;
            }
        }
        sums.iter().map(|s| s / self.rows as f64).collect()
    }

    /// Row-wise Kronecker product: row i of the result is `a[i] ⊗ b[i]`.
    pub fn row_kron(&self, other: &Matrix) -> Result<Matrix, CoreError> {
        if self.rows != other.rows {
            return Err(CoreError::shape(
                (self.rows, other.cols),
                (other.rows, other.cols),
            ));
        }
        let cols = self.cols * other.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for i in 0..self.rows {
            for &a in self.row(i) {
                for &b in other.row(i) {
                    data.push(a * b);
                }
            }
        }
        Ok(Matrix {
            rows: self.rows,
            cols,
            data,
        })
    }

    /// Lower-triangular Cholesky factor L with A = L Lᵀ.
    pub fn cholesky(&self) -> Result<Matrix, CoreError> {
        if self.rows != self.cols {
            return Err(CoreError::shape((self.rows, self.rows), self.shape()));
        }
        let n = self.rows;
        let mut l = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let mut sum = self.get(i, j);
                for k in 0..j {
                    sum -= l.get(i, k) * l.get(j, k);
                }
                if i == j {
                    if !sum.is_finite() || sum <= 1e-12 * self.get(i, i).abs() {
                        return Err(CoreError::SingularMatrix);
                    }
                    l.set(i, i, sum.sqrt());
                } else {
                    l.set(i, j, sum / l.get(j, j));
                }
            }
        }
        Ok(l)
    }

    /// Solve L Lᵀ x = b given the factor L.
    fn cholesky_substitute(l: &Matrix, b: &[f64]) -> Vec<f64> {
        let n = l.rows;
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= l.get(i, k) * y[k];
            }
            y[i] = sum / l.get(i, i);
        }
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for k in i + 1..n {
                sum -= l.get(k, i) * x[k];
            }
            x[i] = sum / l.get(i, i);
        }
        x
    }

    /// Solve A x = b for symmetric positive-definite A.
    pub fn solve_spd(&self, b: &[f64]) -> Result<Vec<f64>, CoreError> {
        if b.len() != self.rows {
            return Err(CoreError::shape((self.rows, 1), (b.len(), 1)));
        }
        let l = self.cholesky()?;
        Ok(Self::cholesky_substitute(&l, b))
    }

    /// Inverse of a symmetric positive-definite matrix.
    pub fn inverse_spd(&self) -> Result<Matrix, CoreError> {
        let l = self.cholesky()?;
        let n = self.rows;
        let mut inv = Matrix::zeros(n, n);
        let mut e = vec![0.0; n];
        for j in 0..n {
            e.iter_mut().for_each(|v| *v = 0.0);
            e[j] = 1.0;
            let col = Self::cholesky_substitute(&l, &e);
            for (i, v) in col.into_iter().enumerate() {
                inv.set(i, j, v);
            }
        }
        Ok(inv)
    }

    /// xᵀ A x
    pub fn quad_form(&self, x: &[f64]) -> Result<f64, CoreError> {
        let ax = self.matvec(x)?;
        Ok(ax.iter().zip(x).map(|(a, b)| a * b).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_matmul() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(vec![vec![5.0], vec![6.0]]).unwrap();
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.shape(), (2, 1));
        assert!(approx(c.get(0, 0), 17.0));
        assert!(approx(c.get(1, 0), 39.0));
    }

    #[test]
    fn test_matmul_shape_mismatch() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 3);
        assert!(matches!(
            a.matmul(&b),
            Err(CoreError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_gram_matches_transpose_product() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        let g = a.gram();
        let expected = a.transpose().matmul(&a).unwrap();
        assert_eq!(g, expected);
    }

    #[test]
    fn test_solve_spd() {
        let a = Matrix::from_rows(vec![vec![4.0, 1.0], vec![1.0, 3.0]]).unwrap();
        let x = a.solve_spd(&[1.0, 2.0]).unwrap();
        let back = a.matvec(&x).unwrap();
        assert!(approx(back[0], 1.0));
        assert!(approx(back[1], 2.0));
    }

    #[test]
    fn test_inverse_spd() {
        let a = Matrix::from_rows(vec![vec![2.0, 0.5], vec![0.5, 1.0]]).unwrap();
        let inv = a.inverse_spd().unwrap();
        let id = a.matmul(&inv).unwrap();
        assert!(approx(id.get(0, 0), 1.0));
        assert!(approx(id.get(0, 1), 0.0));
        assert!(approx(id.get(1, 1), 1.0));
    }

    #[test]
    fn test_singular_detected() {
        let a = Matrix::from_rows(vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        assert_eq!(a.cholesky().unwrap_err(), CoreError::SingularMatrix);
    }

    #[test]
    fn test_with_intercept_on_empty_design() {
        let x = Matrix::zeros(3, 0);
        let z = x.with_intercept();
        assert_eq!(z.shape(), (3, 1));
        assert_eq!(z.column(0), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_row_kron() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let b = Matrix::from_rows(vec![vec![3.0, 4.0]]).unwrap();
        let k = a.row_kron(&b).unwrap();
        assert_eq!(k.row(0), &[3.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_ragged_rows() {
        assert_eq!(
            Matrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).unwrap_err(),
            CoreError::RaggedRows
        );
    }
}
