// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::factor_matrix::{FactorMatrix, NormKind};

/// A rank-R canonical-polyadic (CP) factorization: an ordered sequence of
/// dense factor matrices plus a length-R weight vector `lambda`.
///
/// `isConsistent` (`spec.md` §3) is enforced at construction time and by
/// every mutating method; there is no way to build a [`KTensor`] whose
/// factors disagree on rank.
#[derive(Debug, Clone)]
pub struct KTensor {
    factors: Vec<FactorMatrix>,
    weights: Vec<f64>,
}

impl KTensor {
    /// Build a K-tensor with the given per-mode sizes and rank, all
    /// factors and weights zero-initialized.
    pub fn zeros(sizes: &[usize], rank: usize) -> Self {
        let factors = sizes.iter().map(|&m| FactorMatrix::zeros(m, rank)).collect();
        Self {
            factors,
            weights: vec![0.0; rank],
        }
    }

    /// Build a K-tensor from explicit factors and weights, checking
    /// `isConsistent`.
    pub fn new(factors: Vec<FactorMatrix>, weights: Vec<f64>) -> CoreResult<Self> {
        let kt = Self { factors, weights };
        kt.check_consistent()?;
        Ok(kt)
    }

    fn check_consistent(&self) -> CoreResult<()> {
        let r = self.weights.len();
        for (n, f) in self.factors.iter().enumerate() {
            if f.cols() != r {
                return Err(CoreError::RankMismatch(format!(
                    "factor {n} has {} columns, expected rank {r}",
                    f.cols()
                )));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.factors.len()
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn factor(&self, n: usize) -> &FactorMatrix {
        &self.factors[n]
    }

    #[inline]
    pub fn factor_mut(&mut self, n: usize) -> &mut FactorMatrix {
        &mut self.factors[n]
    }

    #[inline]
    pub fn factors(&self) -> &[FactorMatrix] {
        &self.factors
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn set_factor(&mut self, n: usize, f: FactorMatrix) -> CoreResult<()> {
        if f.cols() != self.rank() {
            return Err(CoreError::RankMismatch(format!(
                "replacement factor for mode {n} has {} columns, expected rank {}",
                f.cols(),
                self.rank()
            )));
        }
        self.factors[n] = f;
        Ok(())
    }

    /// `true` when every factor shares the K-tensor's rank and the weight
    /// vector has that same length -- always true for a value that type
    /// checks, kept as an explicit predicate to mirror the spec's
    /// `isConsistent` name.
    pub fn is_consistent(&self) -> bool {
        self.check_consistent().is_ok()
    }

    /// `true` when `lambda` is all ones (the *distributed* predicate of
    /// `spec.md` §3).
    pub fn is_distributed(&self) -> bool {
        self.weights.iter().all(|&w| (w - 1.0).abs() < f64::EPSILON)
    }

    /// `true` when every factor has unit-norm columns (the *normalized*
    /// predicate of `spec.md` §3), within `tol`.
    pub fn is_normalized(&self, tol: f64) -> bool {
        self.factors.iter().all(|f| {
            f.column_norms(NormKind::L2, 0.0)
                .iter()
                .all(|&n| (n - 1.0).abs() < tol)
        })
    }

    /// Normalize every factor to unit L2-norm columns, absorbing the
    /// removed norms (multiplied by the existing weights) back into
    /// `lambda`. This is the normalization half of `spec.md` §4.6's
    /// "Post-processing" step.
    pub fn normalize(&mut self) -> CoreResult<()> {
        let r = self.rank();
        let mut acc = vec![1.0_f64; r];
        for f in self.factors.iter_mut() {
            let norms = f.column_norms(NormKind::L2, 0.0);
            // A genuinely zero column stays zero; do not divide by zero.
            let safe: Vec<f64> = norms.iter().map(|&n| if n == 0.0 { 1.0 } else { n }).collect();
            f.scale_columns_inv(&safe)?;
            for (a, n) in acc.iter_mut().zip(norms.iter()) {
                *a *= n;
            }
        }
        for (w, a) in self.weights.iter_mut().zip(acc.iter()) {
            *w *= a;
        }
        Ok(())
    }

    /// Absorb `lambda` into the first factor's columns and reset `lambda`
    /// to all ones, establishing the *distributed* predicate.
    pub fn distribute(&mut self) -> CoreResult<()> {
        if let Some(first) = self.factors.first_mut() {
            first.scale_columns(&self.weights)?;
        }
        for w in self.weights.iter_mut() {
            *w = 1.0;
        }
        Ok(())
    }

    /// Stable-sort components by descending weight, ties broken by
    /// original index (`spec.md` §4.6, final post-processing step).
    pub fn sort_components_desc(&mut self) -> CoreResult<()> {
        let r = self.rank();
        let mut order: Vec<usize> = (0..r).collect();
        order.sort_by(|&a, &b| {
            self.weights[b]
                .partial_cmp(&self.weights[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        let new_weights: Vec<f64> = order.iter().map(|&i| self.weights[i]).collect();
        for f in self.factors.iter_mut() {
            *f = f.permute_columns(&order)?;
        }
        self.weights = new_weights;
        Ok(())
    }
}

impl fmt::Display for KTensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "KTensor(ndims={}, rank={})",
            self.ndims(),
            self.rank()
        )?;
        writeln!(f, "lambda = {:?}", self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_mismatch_is_rejected_on_construction() {
        let factors = vec![FactorMatrix::zeros(2, 3), FactorMatrix::zeros(2, 2)];
        let err = KTensor::new(factors, vec![1.0, 1.0, 1.0]).unwrap_err();
        assert!(matches!(err, CoreError::RankMismatch(_)));
    }

    #[test]
    fn normalize_then_distribute_round_trips() {
        let factors = vec![FactorMatrix::from_vec(2, 1, vec![3.0, 4.0]).unwrap()];
        let mut kt = KTensor::new(factors, vec![1.0]).unwrap();
        kt.normalize().unwrap();
        assert!((kt.weights()[0] - 5.0).abs() < 1e-12);
        assert!(kt.is_normalized(1e-9));
        kt.distribute().unwrap();
        assert!(kt.is_distributed());
        assert!((kt.factor(0).get(0, 0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn sort_components_desc_reorders_columns() {
        let factors = vec![FactorMatrix::from_vec(1, 2, vec![10.0, 20.0]).unwrap()];
        let mut kt = KTensor::new(factors, vec![1.0, 5.0]).unwrap();
        kt.sort_components_desc().unwrap();
        assert_eq!(kt.weights(), &[5.0, 1.0]);
        assert_eq!(kt.factor(0).row(0), &[20.0, 10.0]);
    }
}
