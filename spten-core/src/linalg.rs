// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

//! The small dense linear-algebra layer referenced as external in
//! `spec.md` §6: symmetric positive-definite solve and the Gramian
//! (the latter lives on [`crate::FactorMatrix::gramian`]).

use crate::error::{CoreError, CoreResult};
use crate::factor_matrix::FactorMatrix;

/// Lower-triangular Cholesky factor `L` of a symmetric positive-definite
/// matrix `A = L L^T`, stored the same way as [`FactorMatrix`] (row-major,
/// only the lower triangle populated).
#[derive(Debug, Clone)]
pub struct Cholesky {
    r: usize,
    l: Vec<f64>,
}

impl Cholesky {
    /// Factor `a` (`R x R`, symmetric). Fails with
    /// [`CoreError::SingularMatrix`] the moment a diagonal pivot is not
    /// safely positive, which is how `spec.md` §4.6.c's
    /// `SingularNormalEquations` condition is detected one layer down.
    pub fn factor(a: &FactorMatrix) -> CoreResult<Self> {
        if a.rows() != a.cols() {
            return Err(CoreError::ShapeMismatch(format!(
                "Cholesky factorization requires a square matrix, got {}x{}",
                a.rows(),
                a.cols()
            )));
        }
        let r = a.rows();
        let mut l = vec![0.0; r * r];
        for i in 0..r {
            for j in 0..=i {
                let mut sum = a.get(i, j);
                for k in 0..j {
                    sum -= l[i * r + k] * l[j * r + k];
                }
                if i == j {
                    if sum <= 1e-300 || !sum.is_finite() {
                        return Err(CoreError::SingularMatrix(format!(
                            "non-positive pivot {sum} at diagonal {i} during Cholesky factorization"
                        )));
                    }
                    l[i * r + j] = sum.sqrt();
                } else {
                    l[i * r + j] = sum / l[j * r + j];
                }
            }
        }
        Ok(Self { r, l })
    }

    /// Solve `L L^T x = b` in place for a single length-`R` vector.
    fn solve_vec(&self, b: &mut [f64]) {
        let r = self.r;
        // Forward substitution: L y = b.
        for i in 0..r {
            let mut sum = b[i];
            for k in 0..i {
                sum -= self.l[i * r + k] * b[k];
            }
            b[i] = sum / self.l[i * r + i];
        }
        // Back substitution: L^T x = y.
        for i in (0..r).rev() {
            let mut sum = b[i];
            for k in (i + 1)..r {
                sum -= self.l[k * r + i] * b[k];
            }
            b[i] = sum / self.l[i * r + i];
        }
    }

    /// Solve `A X^T = rhs^T` row-by-row, i.e. overwrite each row `v` of
    /// `rhs` with `A^{-1} v`. This is exactly the
    /// `U_n^T <- Upsilon^{-1} V^T` step of `spec.md` §4.6.c, expressed
    /// row-major so no explicit transpose is ever materialized.
    pub fn solve_rows_in_place(&self, rhs: &mut FactorMatrix) -> CoreResult<()> {
        if rhs.cols() != self.r {
            return Err(CoreError::ShapeMismatch(format!(
                "right-hand side has {} columns, Cholesky factor is {}x{}",
                rhs.cols(),
                self.r,
                self.r
            )));
        }
        for i in 0..rhs.rows() {
            self.solve_vec(rhs.row_mut(i));
        }
        Ok(())
    }
}

/// Solve `A X = B` for `X`, overwriting `rhs` (`B`) in place with `X`,
/// where `rhs`'s rows are treated as the right-hand-side vectors. Exposed
/// as a standalone function matching `spec.md` §6's
/// `solvePosDef(A, B) -> B * A^{-1}` collaborator interface.
pub fn solve_pos_def(a: &FactorMatrix, rhs: &mut FactorMatrix) -> CoreResult<()> {
    let chol = Cholesky::factor(a)?;
    chol.solve_rows_in_place(rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_identity_system() {
        let a = FactorMatrix::from_vec(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let mut b = FactorMatrix::from_vec(1, 2, vec![3.0, 4.0]).unwrap();
        solve_pos_def(&a, &mut b).unwrap();
        assert!((b.get(0, 0) - 3.0).abs() < 1e-12);
        assert!((b.get(0, 1) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn solves_small_spd_system() {
        // A = [[4, 2], [2, 3]], known SPD.
        let a = FactorMatrix::from_vec(2, 2, vec![4.0, 2.0, 2.0, 3.0]).unwrap();
        // Solve for x such that A x = [1, 1] -> x = [0.125, 0.25].
        let mut b = FactorMatrix::from_vec(1, 2, vec![1.0, 1.0]).unwrap();
        solve_pos_def(&a, &mut b).unwrap();
        assert!((b.get(0, 0) - 0.125).abs() < 1e-10);
        assert!((b.get(0, 1) - 0.25).abs() < 1e-10);
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let a = FactorMatrix::from_vec(2, 2, vec![0.0, 0.0, 0.0, 0.0]).unwrap();
        let err = Cholesky::factor(&a).unwrap_err();
        assert!(matches!(err, CoreError::SingularMatrix(_)));
    }
}
