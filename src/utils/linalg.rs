//! Small dense matrices and a Householder QR solver for square systems.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::config::SINGULARITY_TOLERANCE;
use crate::error::{PhysmError, Result};

/// Row-major dense matrix sized at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut mat = Self::zeros(n, n);
        for i in 0..n {
            mat[(i, i)] = 1.0;
        }
        mat
    }

    /// Builds a matrix from equally sized rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != cols) {
            return Err(PhysmError::dimension(format!(
                "expected rows of length {cols}; got {}",
                bad.len()
            )));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    /// Column vector (`n × 1`).
    pub fn column(values: &[f64]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out[(c, r)] = self[(r, c)];
            }
        }
        out
    }

    /// Matrix product, checking inner dimensions.
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(PhysmError::dimension(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for r in 0..self.rows {
            for k in 0..self.cols {
                let lhs = self[(r, k)];
                if lhs == 0.0 {
                    continue;
                }
                for c in 0..other.cols {
                    out[(r, c)] += lhs * other[(k, c)];
                }
            }
        }
        Ok(out)
    }

    /// Whether both matrices share a shape and agree entry-wise within `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).abs() < tolerance)
    }

    /// Householder QR decomposition `A = Q R` of a square matrix.
    pub fn qr(&self) -> Result<QrDecomposition> {
        if !self.is_square() {
            return Err(PhysmError::dimension(format!(
                "QR decomposition expects a square matrix; got {}x{}",
                self.rows, self.cols
            )));
        }
        let n = self.rows;
        let mut r = self.clone();
        let mut q = Self::identity(n);
        let mut v = vec![0.0; n];

        for k in 0..n {
            let norm = (k..n).map(|i| r[(i, k)] * r[(i, k)]).sum::<f64>().sqrt();
            if norm == 0.0 {
                continue;
            }
            let alpha = if r[(k, k)] > 0.0 { -norm } else { norm };
            for i in k..n {
                v[i] = r[(i, k)];
            }
            v[k] -= alpha;
            let v_norm_sq: f64 = (k..n).map(|i| v[i] * v[i]).sum();
            if v_norm_sq == 0.0 {
                continue;
            }

            // R <- H R
            for c in k..n {
                let s: f64 = (k..n).map(|i| v[i] * r[(i, c)]).sum();
                let factor = 2.0 * s / v_norm_sq;
                for i in k..n {
                    r[(i, c)] -= factor * v[i];
                }
            }
            // Q <- Q H
            for row in 0..n {
                let s: f64 = (k..n).map(|i| q[(row, i)] * v[i]).sum();
                let factor = 2.0 * s / v_norm_sq;
                for i in k..n {
                    q[(row, i)] -= factor * v[i];
                }
            }
            r[(k, k)] = alpha;
            for i in (k + 1)..n {
                r[(i, k)] = 0.0;
            }
        }

        Ok(QrDecomposition { q, r })
    }
}

impl Index<(usize, usize)> for DenseMatrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for DenseMatrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for DenseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for r in 0..self.rows {
            if r > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[")?;
            for (c, value) in self.row(r).iter().enumerate() {
                if c > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{value}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}

/// Factors of a QR decomposition.
#[derive(Debug, Clone)]
pub struct QrDecomposition {
    /// Orthogonal factor.
    pub q: DenseMatrix,
    /// Upper-triangular factor.
    pub r: DenseMatrix,
}

impl QrDecomposition {
    /// Solves `R x = Qᵗ b` by back-substitution.
    ///
    /// `source` is only used to name the matrix when `R` has a diagonal entry
    /// below [`SINGULARITY_TOLERANCE`].
    pub fn solve(&self, b: &[f64], source: &DenseMatrix) -> Result<Vec<f64>> {
        let n = self.r.rows();
        if b.len() != n {
            return Err(PhysmError::dimension(format!(
                "expected right-hand side of length {n}; got {}",
                b.len()
            )));
        }
        if (0..n).any(|k| self.r[(k, k)].abs() < SINGULARITY_TOLERANCE) {
            return Err(PhysmError::SingularMatrix {
                matrix: source.to_string(),
            });
        }

        let qtb: Vec<f64> = (0..n)
            .map(|c| (0..n).map(|r| self.q[(r, c)] * b[r]).sum())
            .collect();

        let mut x = vec![0.0; n];
        for k in (0..n).rev() {
            let tail: f64 = ((k + 1)..n).map(|c| self.r[(k, c)] * x[c]).sum();
            x[k] = (qtb[k] - tail) / self.r[(k, k)];
        }
        Ok(x)
    }
}

/// Solves the square system `A x = b`, returning `x` as a plain sequence.
pub fn solve_linear_system(a: &DenseMatrix, b: &[f64]) -> Result<Vec<f64>> {
    a.qr()?.solve(b, a)
}

/// Solves `A x = b` for a column vector `b`, returning `x` as a column vector.
pub fn solve_linear_system_column(a: &DenseMatrix, b: &DenseMatrix) -> Result<DenseMatrix> {
    if b.cols() != 1 {
        return Err(PhysmError::dimension(format!(
            "expected a column vector; got {}x{}",
            b.rows(),
            b.cols()
        )));
    }
    solve_linear_system(a, b.as_slice()).map(|x| DenseMatrix::column(&x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat(rows: &[&[f64]]) -> DenseMatrix {
        DenseMatrix::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn identity_system_returns_rhs() {
        let x = solve_linear_system(&DenseMatrix::identity(3), &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(x, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn column_variant_returns_column() {
        let b = DenseMatrix::column(&[1.0, 2.0, 3.0]);
        let x = solve_linear_system_column(&DenseMatrix::identity(3), &b).unwrap();
        assert_eq!(x.cols(), 1);
        assert!(x.approx_eq(&b, 1e-12));
    }

    #[test]
    fn qr_reconstructs_input() {
        let a = mat(&[&[4.0, 1.0, -2.0], &[1.0, 3.0, 0.5], &[-2.0, 0.5, 5.0]]);
        let qr = a.qr().unwrap();
        assert!(qr.q.matmul(&qr.r).unwrap().approx_eq(&a, 1e-12));
        let qtq = qr.q.transpose().matmul(&qr.q).unwrap();
        assert!(qtq.approx_eq(&DenseMatrix::identity(3), 1e-12));
        for r in 1..3 {
            for c in 0..r {
                assert!(qr.r[(r, c)].abs() < 1e-12);
            }
        }
    }

    #[test]
    fn solves_general_system() {
        let a = mat(&[&[2.0, 1.0, 1.0], &[1.0, 3.0, 2.0], &[1.0, 0.0, 0.0]]);
        let expected = [1.0, -2.0, 3.0];
        let b: Vec<f64> = (0..3)
            .map(|r| a.row(r).iter().zip(&expected).map(|(x, y)| x * y).sum())
            .collect();
        let x = solve_linear_system(&a, &b).unwrap();
        for (got, want) in x.iter().zip(expected) {
            assert!((got - want).abs() < 1e-10);
        }
    }

    #[test]
    fn singular_matrix_is_reported() {
        // Third row is the sum of the first two.
        let a = mat(&[&[2.0, 0.0, 1.0], &[0.0, 1.0, 1.0], &[2.0, 1.0, 2.0]]);
        let err = solve_linear_system(&a, &[1.0, 2.0, 3.0]).unwrap_err();
        match err {
            PhysmError::SingularMatrix { matrix } => {
                assert_eq!(matrix, "[[2, 0, 1], [0, 1, 1], [2, 1, 2]]");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn zero_matrix_is_singular() {
        let a = DenseMatrix::zeros(2, 2);
        assert!(matches!(
            solve_linear_system(&a, &[0.0, 0.0]),
            Err(PhysmError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn shape_errors() {
        assert!(matches!(
            DenseMatrix::zeros(2, 3).qr(),
            Err(PhysmError::Dimension(_))
        ));
        assert!(matches!(
            solve_linear_system(&DenseMatrix::identity(2), &[1.0]),
            Err(PhysmError::Dimension(_))
        ));
        assert!(DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![1.0]]).is_err());
    }
}
