// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use rayon::prelude::*;

use spten_core::FactorMatrix;
use spten_sparse::SparseTensor;

use crate::error::{KernelError, KernelResult};
use crate::tile::reduce_row;

const TEAM_CHUNK: usize = 1024;

/// `<X, lambda . [U_1, ..., U_N]>` (`spec.md` §4.5): a three-level
/// reduction over `(nonzero, rank-column)`. `rayon`'s chunked parallel
/// iterator plays the role of the team-level reduction, each chunk's
/// local fold plays the per-team accumulator, and the final `.sum()`
/// plays the grand reduction across teams.
pub fn inner_product(
    x: &SparseTensor,
    factors: &[&FactorMatrix],
    lambda: &[f64],
) -> KernelResult<f64> {
    if factors.len() != x.ndims() {
        return Err(KernelError::ShapeMismatch(format!(
            "expected {} factor matrices, got {}",
            x.ndims(),
            factors.len()
        )));
    }
    let r = lambda.len();
    for (m, f) in factors.iter().enumerate() {
        if f.cols() != r {
            return Err(KernelError::ShapeMismatch(format!(
                "factor {m} has {} columns, expected rank {r}",
                f.cols()
            )));
        }
        if f.rows() != x.size(m) {
            return Err(KernelError::ShapeMismatch(format!(
                "factor {m} has {} rows, expected mode size {}",
                f.rows(),
                x.size(m)
            )));
        }
    }

    let total = (0..x.nnz())
        .into_par_iter()
        .chunks(TEAM_CHUNK)
        .map(|block| {
            block
                .into_iter()
                .map(|k| {
                    let factor_rows: Vec<&[f64]> = (0..x.ndims())
                        .map(|m| factors[m].row(x.subscript(k, m)))
                        .collect();
                    reduce_row(x.value(k), lambda, &factor_rows)
                })
                .sum::<f64>()
        })
        .sum();

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spten_sparse::SparseTensor;

    #[test]
    fn scenario_b_inner_product_matches_spec() {
        // spec.md §8 Scenario B: same tensor/factors as Scenario A. With a
        // single-column U, the product over all three modes is nonzero
        // only where every mode's subscript is 0.
        let x = SparseTensor::new(
            vec![2, 2, 2],
            vec![0, 0, 0, 1, 0, 1, 0, 1, 1],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();
        let factors = vec![
            FactorMatrix::from_vec(2, 1, vec![1.0, 0.0]).unwrap(),
            FactorMatrix::from_vec(2, 1, vec![1.0, 0.0]).unwrap(),
            FactorMatrix::from_vec(2, 1, vec![1.0, 0.0]).unwrap(),
        ];
        let refs: Vec<&FactorMatrix> = factors.iter().collect();
        let value = inner_product(&x, &refs, &[1.0]).unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn inner_product_reference_cross_check() {
        let x = SparseTensor::new(
            vec![3, 2],
            vec![0, 0, 1, 1, 2, 0],
            vec![2.0, 3.0, 4.0],
        )
        .unwrap();
        let a = FactorMatrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b = FactorMatrix::from_vec(2, 2, vec![1.0, 1.0, 2.0, 2.0]).unwrap();
        let lambda = vec![1.0, 0.5];
        let refs = vec![&a, &b];
        let got = inner_product(&x, &refs, &lambda).unwrap();

        let mut reference = 0.0;
        for k in 0..x.nnz() {
            let i = x.subscript(k, 0);
            let j = x.subscript(k, 1);
            for c in 0..2 {
                reference += x.value(k) * lambda[c] * a.get(i, c) * b.get(j, c);
            }
        }
        assert!((got - reference).abs() <= 1e3 * f64::EPSILON * reference.abs().max(1.0));
    }
}
