// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use rayon::prelude::*;

use spten_core::FactorMatrix;
use spten_sparse::{Layout, SparseTensor};

use crate::atomic_f64::AtomicF64;
use crate::error::{KernelError, KernelResult};
use crate::tile::accumulate_row;

/// Target row-block length for the permuted-COO kernel (`spec.md` §4.3).
const ROW_BLOCK: usize = 128;

/// Nonzeros processed per rayon work item ("team") before results are
/// folded -- the league/team granularity of `spec.md` §5.
const TEAM_CHUNK: usize = 1024;

fn other_modes(ndims: usize, n: usize) -> Vec<usize> {
    (0..ndims).filter(|&m| m != n).collect()
}

fn check_shapes(
    x: &SparseTensor,
    factors: &[&FactorMatrix],
    lambda: &[f64],
    n: usize,
) -> KernelResult<()> {
    if n >= x.ndims() {
        return Err(KernelError::ShapeMismatch(format!(
            "target mode {n} is out of range for ndims {}",
            x.ndims()
        )));
    }
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
    Ok(())
}

/// Compute the MTTKRP output `V` for target mode `n`, using the COO
/// (fully atomic) kernel of `spec.md` §4.2. Every nonzero is processed
/// independently and scatter-added into `V[subs[k,n], :]`.
pub fn mttkrp_coo(
    x: &SparseTensor,
    factors: &[&FactorMatrix],
    lambda: &[f64],
    n: usize,
) -> KernelResult<FactorMatrix> {
    check_shapes(x, factors, lambda, n)?;
    let r = lambda.len();
    let rows = x.size(n);
    let modes = other_modes(x.ndims(), n);

    let v: Vec<AtomicF64> = (0..rows * r).map(|_| AtomicF64::new(0.0)).collect();

    (0..x.nnz())
        .into_par_iter()
        .chunks(TEAM_CHUNK)
        .for_each(|block| {
            let mut local = vec![0.0_f64; r];
            for k in block {
                let target = x.subscript(k, n);
                let factor_rows: Vec<&[f64]> = modes
                    .iter()
                    .map(|&m| factors[m].row(x.subscript(k, m)))
                    .collect();
                local.iter_mut().for_each(|v| *v = 0.0);
                accumulate_row(x.value(k), lambda, &factor_rows, &mut local);
                let base = target * r;
                for (j, val) in local.iter().enumerate() {
                    v[base + j].fetch_add(*val);
                }
            }
        });

    let data: Vec<f64> = v.iter().map(AtomicF64::load).collect();
    FactorMatrix::from_vec(rows, r, data)
        .map_err(|e| KernelError::ShapeMismatch(e.to_string()))
}

/// Compute the MTTKRP output `V` using the permuted-COO kernel of
/// `spec.md` §4.3: nonzeros are visited in mode-`n` sorted order so runs
/// of `ROW_BLOCK` nonzeros sharing a target row accumulate locally
/// before a single atomic flush, trading atomic density for sort-grouped
/// writes. `fill_complete(n, Layout::Permuted)` must already have been
/// called.
pub fn mttkrp_permuted(
    x: &SparseTensor,
    factors: &[&FactorMatrix],
    lambda: &[f64],
    n: usize,
) -> KernelResult<FactorMatrix> {
    check_shapes(x, factors, lambda, n)?;
    if !x.has_perm(n) {
        return Err(KernelError::ShapeMismatch(format!(
            "mode {n} has no permutation; call fill_complete(n, Layout::Permuted) first"
        )));
    }
    let r = lambda.len();
    let rows = x.size(n);
    let modes = other_modes(x.ndims(), n);
    let perm = x.perm_slice(n);

    let v: Vec<AtomicF64> = (0..rows * r).map(|_| AtomicF64::new(0.0)).collect();

    perm.par_chunks(ROW_BLOCK).for_each(|block| {
        let mut acc = vec![0.0_f64; r];
        let mut current_row: Option<usize> = None;
        let flush = |row: usize, acc: &mut Vec<f64>| {
            let base = row * r;
            for (j, val) in acc.iter().enumerate() {
                if *val != 0.0 {
                    v[base + j].fetch_add(*val);
                }
            }
            for val in acc.iter_mut() {
                *val = 0.0;
            }
        };
        for &k in block {
            let row = x.subscript(k, n);
            if current_row != Some(row) {
                if let Some(prev) = current_row {
                    flush(prev, &mut acc);
                }
                current_row = Some(row);
            }
            let factor_rows: Vec<&[f64]> = modes
                .iter()
                .map(|&m| factors[m].row(x.subscript(k, m)))
                .collect();
            accumulate_row(x.value(k), lambda, &factor_rows, &mut acc);
        }
        if let Some(row) = current_row {
            flush(row, &mut acc);
        }
    });

    let data: Vec<f64> = v.iter().map(AtomicF64::load).collect();
    FactorMatrix::from_vec(rows, r, data)
        .map_err(|e| KernelError::ShapeMismatch(e.to_string()))
}

/// Compute the MTTKRP output `V` using the row-indexed kernel of
/// `spec.md` §4.4: each output row is owned exclusively by one worker, so
/// no atomics are needed at all. `fill_complete(n, Layout::RowIndexed)`
/// must already have been called.
pub fn mttkrp_row_indexed(
    x: &SparseTensor,
    factors: &[&FactorMatrix],
    lambda: &[f64],
    n: usize,
) -> KernelResult<FactorMatrix> {
    check_shapes(x, factors, lambda, n)?;
    if !x.has_rowptr(n) {
        return Err(KernelError::ShapeMismatch(format!(
            "mode {n} has no row pointer; call fill_complete(n, Layout::RowIndexed) first"
        )));
    }
    let r = lambda.len();
    let rows = x.size(n);
    let modes = other_modes(x.ndims(), n);
    let perm = x.perm_slice(n);

    let mut data = vec![0.0_f64; rows * r];
    data.par_chunks_mut(r).enumerate().for_each(|(row, out)| {
        let begin = x.row_begin(n, row);
        let end = x.row_begin(n, row + 1);
        for &k in &perm[begin..end] {
            let factor_rows: Vec<&[f64]> = modes
                .iter()
                .map(|&m| factors[m].row(x.subscript(k, m)))
                .collect();
            accumulate_row(x.value(k), lambda, &factor_rows, out);
        }
    });

    FactorMatrix::from_vec(rows, r, data).map_err(|e| KernelError::ShapeMismatch(e.to_string()))
}

/// Raw-pointer fast path for the permuted-COO kernel, gated behind the
/// `fast-unsafe` feature the way `dcl_data_structures` gates
/// `grid_unsafe` behind its own `unsafe` feature. Boundary rows of a
/// block (which may collide with an adjacent block) still go through an
/// atomic CAS add; interior rows -- provably exclusive to this block,
/// per `spec.md` §4.3 -- are written directly, skipping the CAS retry
/// loop entirely.
#[cfg(feature = "fast-unsafe")]
pub mod fast_unsafe {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct RawView(*mut f64);
    // Safety: every write site below addresses a distinct `row * r..(row+1)*r`
    // range; interior-row exclusivity is guaranteed by the row-block
    // partitioning in `mttkrp_permuted_fast`, and boundary rows are only ever
    // touched through the atomic path.
    unsafe impl Sync for RawView {}

    impl RawView {
        unsafe fn atomic_add(&self, idx: usize, delta: f64) {
            let word = self.0.add(idx) as *mut u64;
            let atom = AtomicU64::from_ptr(word);
            let mut current = atom.load(Ordering::Relaxed);
            loop {
                let new = (f64::from_bits(current) + delta).to_bits();
                match atom.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed) {
                    Ok(_) => return,
                    Err(actual) => current = actual,
                }
            }
        }

        unsafe fn plain_add(&self, idx: usize, delta: f64) {
            *self.0.add(idx) += delta;
        }
    }

    pub fn mttkrp_permuted_fast(
        x: &SparseTensor,
        factors: &[&FactorMatrix],
        lambda: &[f64],
        n: usize,
    ) -> KernelResult<FactorMatrix> {
        check_shapes(x, factors, lambda, n)?;
        if !x.has_perm(n) {
            return Err(KernelError::ShapeMismatch(format!(
                "mode {n} has no permutation; call fill_complete(n, Layout::Permuted) first"
            )));
        }
        let r = lambda.len();
        let rows = x.size(n);
        let modes = other_modes(x.ndims(), n);
        let perm = x.perm_slice(n);

        let mut data = vec![0.0_f64; rows * r];
        let view = RawView(data.as_mut_ptr());

        perm.par_chunks(ROW_BLOCK).for_each(|block| {
            let mut acc = vec![0.0_f64; r];
            let mut current_row: Option<usize> = None;
            let mut is_first_row = true;
            let flush = |row: usize, acc: &mut Vec<f64>, boundary: bool| {
                let base = row * r;
                for (j, val) in acc.iter().enumerate() {
                    if *val == 0.0 {
                        continue;
                    }
                    // Safety: `base + j < rows * r` because `row < rows` and
                    // `j < r`; `boundary` selects the atomic path whenever this
                    // row might be shared with a neighboring block.
                    unsafe {
                        if boundary {
                            view.atomic_add(base + j, *val);
                        } else {
                            view.plain_add(base + j, *val);
                        }
                    }
                }
                for val in acc.iter_mut() {
                    *val = 0.0;
                }
            };
            for &k in block {
                let row = x.subscript(k, n);
                if current_row != Some(row) {
                    if let Some(prev) = current_row {
                        flush(prev, &mut acc, is_first_row);
                        is_first_row = false;
                    }
                    current_row = Some(row);
                }
                let factor_rows: Vec<&[f64]> = modes
                    .iter()
                    .map(|&m| factors[m].row(x.subscript(k, m)))
                    .collect();
                accumulate_row(x.value(k), lambda, &factor_rows, &mut acc);
            }
            if let Some(row) = current_row {
                // The last row of a block may collide with the next block's
                // first row, so it always takes the atomic path.
                flush(row, &mut acc, true);
            }
        });

        FactorMatrix::from_vec(rows, r, data)
            .map_err(|e| KernelError::ShapeMismatch(e.to_string()))
    }
}

/// Which of the three storage layouts an MTTKRP call should use. Selected
/// once per call at the kernel boundary, per the "Variant polymorphism"
/// design note in `spec.md` §9 -- not virtual dispatch in the hot path.
pub fn mttkrp(
    x: &SparseTensor,
    factors: &[&FactorMatrix],
    lambda: &[f64],
    n: usize,
    layout: Layout,
) -> KernelResult<FactorMatrix> {
    match layout {
        Layout::Coo => mttkrp_coo(x, factors, lambda, n),
        Layout::Permuted => mttkrp_permuted(x, factors, lambda, n),
        Layout::RowIndexed => mttkrp_row_indexed(x, factors, lambda, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a_tensor() -> SparseTensor {
        // spec.md §8 Scenario A: 2x2x2 sparse tensor.
        SparseTensor::new(
            vec![2, 2, 2],
            vec![0, 0, 0, 1, 0, 1, 0, 1, 1],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap()
    }

    fn identity_factors() -> Vec<FactorMatrix> {
        vec![
            FactorMatrix::from_vec(2, 1, vec![1.0, 0.0]).unwrap(),
            FactorMatrix::from_vec(2, 1, vec![1.0, 0.0]).unwrap(),
            FactorMatrix::from_vec(2, 1, vec![1.0, 0.0]).unwrap(),
        ]
    }

    #[test]
    fn scenario_a_mttkrp_mode_0_matches_spec() {
        let x = scenario_a_tensor();
        let factors = identity_factors();
        let refs: Vec<&FactorMatrix> = factors.iter().collect();
        let v = mttkrp_coo(&x, &refs, &[1.0], 0).unwrap();
        assert_eq!(v.get(0, 0), 1.0);
        assert_eq!(v.get(1, 0), 2.0);
    }

    #[test]
    fn scenario_a_mttkrp_mode_2_matches_spec() {
        let x = scenario_a_tensor();
        let factors = identity_factors();
        let refs: Vec<&FactorMatrix> = factors.iter().collect();
        let v = mttkrp_coo(&x, &refs, &[1.0], 2).unwrap();
        assert_eq!(v.get(0, 0), 1.0);
        assert_eq!(v.get(1, 0), 5.0);
    }

    #[test]
    fn all_three_variants_agree_on_a_denser_tensor() {
        let mut x = SparseTensor::new(
            vec![4, 5, 3],
            vec![
                0, 0, 0, 1, 2, 1, 2, 4, 2, 3, 1, 0, 0, 3, 2, 1, 1, 1, 2, 0, 1, 3, 4, 0,
            ],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        )
        .unwrap();
        let factors: Vec<FactorMatrix> = (0..3)
            .map(|m| {
                let rows = x.size(m);
                FactorMatrix::from_vec(
                    rows,
                    2,
                    (0..rows * 2).map(|i| (i + 1) as f64 * 0.1).collect(),
                )
                .unwrap()
            })
            .collect();
        let refs: Vec<&FactorMatrix> = factors.iter().collect();
        let lambda = vec![1.0, 1.0];

        for n in 0..3 {
            x.fill_complete(n, Layout::RowIndexed).unwrap();
            let coo = mttkrp_coo(&x, &refs, &lambda, n).unwrap();
            let perm = mttkrp_permuted(&x, &refs, &lambda, n).unwrap();
            let rowi = mttkrp_row_indexed(&x, &refs, &lambda, n).unwrap();

            let norm_coo: f64 = coo.as_slice().iter().map(|v| v * v).sum::<f64>().sqrt();
            for (a, b) in coo.as_slice().iter().zip(perm.as_slice().iter()) {
                assert!((a - b).abs() <= 1e3 * f64::EPSILON * norm_coo.max(1.0));
            }
            for (a, b) in coo.as_slice().iter().zip(rowi.as_slice().iter()) {
                assert!((a - b).abs() <= 1e3 * f64::EPSILON * norm_coo.max(1.0));
            }
        }
    }

    #[test]
    fn rejects_shape_mismatch() {
        let x = scenario_a_tensor();
        let factors = vec![FactorMatrix::zeros(2, 2); 3];
        let refs: Vec<&FactorMatrix> = factors.iter().collect();
        let err = mttkrp_coo(&x, &refs, &[1.0, 1.0, 1.0], 0).unwrap_err();
        assert!(matches!(err, KernelError::ShapeMismatch(_)));
    }

    #[cfg(feature = "fast-unsafe")]
    #[test]
    fn fast_unsafe_permuted_agrees_with_safe_permuted() {
        use super::fast_unsafe::mttkrp_permuted_fast;

        let mut x = SparseTensor::new(
            vec![4, 5, 3],
            vec![
                0, 0, 0, 1, 2, 1, 2, 4, 2, 3, 1, 0, 0, 3, 2, 1, 1, 1, 2, 0, 1, 3, 4, 0,
            ],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        )
        .unwrap();
        let factors: Vec<FactorMatrix> = (0..3)
            .map(|m| {
                let rows = x.size(m);
                FactorMatrix::from_vec(
                    rows,
                    2,
                    (0..rows * 2).map(|i| (i + 1) as f64 * 0.1).collect(),
                )
                .unwrap()
            })
            .collect();
        let refs: Vec<&FactorMatrix> = factors.iter().collect();
        let lambda = vec![1.0, 1.0];

        for n in 0..3 {
            x.fill_complete(n, Layout::Permuted).unwrap();
            let safe = mttkrp_permuted(&x, &refs, &lambda, n).unwrap();
            let fast = mttkrp_permuted_fast(&x, &refs, &lambda, n).unwrap();
            let norm: f64 = safe.as_slice().iter().map(|v| v * v).sum::<f64>().sqrt();
            for (a, b) in safe.as_slice().iter().zip(fast.as_slice().iter()) {
                assert!((a - b).abs() <= 1e3 * f64::EPSILON * norm.max(1.0));
            }
        }
    }
}
