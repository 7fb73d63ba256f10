// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use std::collections::HashMap;
use std::fmt;

use crate::error::{SparseError, SparseResult};

/// Which accelerators [`SparseTensor::fill_complete`] has built and which
/// MTTKRP kernel (`spec.md` §4.2-4.4) is entitled to use them.
///
/// The three storage "variants" of the spec are not three Rust types --
/// per `spec.md` §9's "Variant polymorphism" design note, they are three
/// states of preprocessing on one struct, dispatched by tag at the MTTKRP
/// entry point rather than through virtual dispatch in the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// No preprocessing; every MTTKRP nonzero write must be atomic.
    Coo,
    /// Per-mode permutations sorting nonzeros by that mode's subscript are
    /// available via [`SparseTensor::perm`].
    Permuted,
    /// Permutations and per-mode row-pointer prefix sums are available via
    /// [`SparseTensor::perm`] and [`SparseTensor::row_begin`].
    RowIndexed,
}

#[derive(Debug, Clone, Default)]
struct ModeAccelerator {
    perm: Vec<usize>,
    rowptr: Vec<usize>,
}

/// A sparse N-way tensor in coordinate (COO) form, with the permutation and
/// row-pointer accelerators of `spec.md` §3 built lazily by
/// [`fill_complete`](SparseTensor::fill_complete).
///
/// `subs` is stored flattened, row-major over `(nnz, ndims)`: subscript `d`
/// of nonzero `k` is `subs[k * ndims + d]`.
#[derive(Debug, Clone)]
pub struct SparseTensor {
    size: Vec<usize>,
    subs: Vec<usize>,
    vals: Vec<f64>,
    accel: Vec<Option<ModeAccelerator>>,
}

impl SparseTensor {
    /// Build a sparse tensor from flattened subscripts and values.
    /// Duplicate subscript tuples are kept as-is (their values sum
    /// semantically under MTTKRP/inner-product, per `spec.md` §3); use
    /// [`SparseTensor::from_triplets_merged`] to merge them eagerly.
    pub fn new(size: Vec<usize>, subs: Vec<usize>, vals: Vec<f64>) -> SparseResult<Self> {
        let ndims = size.len();
        if ndims == 0 {
            return Err(SparseError::ShapeMismatch(
                "a sparse tensor needs at least one mode".into(),
            ));
        }
        let nnz = vals.len();
        if subs.len() != nnz * ndims {
            return Err(SparseError::ShapeMismatch(format!(
                "subs has {} entries, expected nnz*ndims = {}*{} = {}",
                subs.len(),
                nnz,
                ndims,
                nnz * ndims
            )));
        }
        for k in 0..nnz {
            for d in 0..ndims {
                let s = subs[k * ndims + d];
                if s >= size[d] {
                    return Err(SparseError::IndexOutOfRange(format!(
                        "nonzero {k} has subscript {s} on mode {d}, but size[{d}] = {}",
                        size[d]
                    )));
                }
            }
        }
        Ok(Self {
            size,
            subs,
            vals,
            accel: vec![None; ndims],
        })
    }

    /// Build a sparse tensor from `(subs, value)` triplets, merging
    /// duplicate subscript tuples by summation on ingest. This resolves
    /// the Open Question in `spec.md` §9 in favor of "merge on ingest"
    /// (see `DESIGN.md`).
    pub fn from_triplets_merged(
        size: Vec<usize>,
        triplets: Vec<(Vec<usize>, f64)>,
    ) -> SparseResult<Self> {
        let ndims = size.len();
        let mut merged: HashMap<Vec<usize>, f64> = HashMap::with_capacity(triplets.len());
        for (subs, val) in triplets {
            if subs.len() != ndims {
                return Err(SparseError::ShapeMismatch(format!(
                    "triplet has {} subscripts, expected {ndims}",
                    subs.len()
                )));
            }
            *merged.entry(subs).or_insert(0.0) += val;
        }
        let nnz = merged.len();
        let mut subs = Vec::with_capacity(nnz * ndims);
        let mut vals = Vec::with_capacity(nnz);
        for (s, v) in merged {
            subs.extend_from_slice(&s);
            vals.push(v);
        }
        Self::new(size, subs, vals)
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.size.len()
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    #[inline]
    pub fn size(&self, d: usize) -> usize {
        self.size[d]
    }

    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.size
    }

    #[inline]
    pub fn subscript(&self, k: usize, d: usize) -> usize {
        self.subs[k * self.ndims() + d]
    }

    #[inline]
    pub fn value(&self, k: usize) -> f64 {
        self.vals[k]
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.vals
    }

    /// Squared Frobenius norm of the stored values, `sum(v_k^2)`, used by
    /// the CP-ALS residual computation (`spec.md` §4.6, step 3).
    pub fn norm_squared(&self) -> f64 {
        self.vals.iter().map(|v| v * v).sum()
    }

    /// One-shot, idempotent preprocessing: build the permutation (and, for
    /// [`Layout::RowIndexed`], the row-pointer prefix sums) for mode `d`.
    /// Calling this twice for the same `(d, layout)` is a no-op that
    /// reproduces identical accelerators (`spec.md` §8, testable property
    /// 3), since the underlying nonzero order never changes.
    pub fn fill_complete(&mut self, d: usize, layout: Layout) -> SparseResult<()> {
        if d >= self.ndims() {
            return Err(SparseError::IndexOutOfRange(format!(
                "mode index {d} is out of range for ndims {}",
                self.ndims()
            )));
        }
        match layout {
            Layout::Coo => Ok(()),
            Layout::Permuted => {
                self.ensure_perm(d);
                Ok(())
            }
            Layout::RowIndexed => {
                self.ensure_perm(d);
                self.ensure_rowptr(d);
                Ok(())
            }
        }
    }

    fn ensure_perm(&mut self, d: usize) {
        if self.accel[d].is_some() {
            return;
        }
        let ndims = self.ndims();
        let subs = &self.subs;
        let mut perm: Vec<usize> = (0..self.nnz()).collect();
        // Stable sort keyed on subs[k, d]; ties broken by nonzero index,
        // which `sort_by_key` already guarantees as it is a stable sort.
        perm.sort_by_key(|&k| subs[k * ndims + d]);
        self.accel[d] = Some(ModeAccelerator {
            perm,
            rowptr: Vec::new(),
        });
    }

    fn ensure_rowptr(&mut self, d: usize) {
        let has_rowptr = self.accel[d]
            .as_ref()
            .map(|a| !a.rowptr.is_empty() || self.size[d] == 0)
            .unwrap_or(false);
        if has_rowptr {
            return;
        }
        let size_d = self.size[d];
        let ndims = self.ndims();
        let subs = &self.subs;
        let perm = self.accel[d].as_ref().expect("perm built before rowptr").perm.clone();
        let mut rowptr = vec![0usize; size_d + 1];
        for &k in &perm {
            let r = subs[k * ndims + d];
            rowptr[r + 1] += 1;
        }
        for r in 0..size_d {
            rowptr[r + 1] += rowptr[r];
        }
        if let Some(accel) = self.accel[d].as_mut() {
            accel.rowptr = rowptr;
        }
    }

    /// `pi_d[i]`: the index of the nonzero at sorted position `i` in mode
    /// `d`'s permutation. Panics if `fill_complete` has not been called for
    /// `(d, Permuted | RowIndexed)`.
    pub fn perm(&self, d: usize, i: usize) -> usize {
        self.accel[d]
            .as_ref()
            .expect("fill_complete was not called for this mode")
            .perm[i]
    }

    /// The full permutation slice for mode `d`.
    pub fn perm_slice(&self, d: usize) -> &[usize] {
        &self.accel[d]
            .as_ref()
            .expect("fill_complete was not called for this mode")
            .perm
    }

    /// `rowptr_d[r]`: the offset into the permutation at which row `r`'s
    /// nonzeros begin. Panics if `fill_complete` has not been called for
    /// `(d, RowIndexed)`.
    pub fn row_begin(&self, d: usize, r: usize) -> usize {
        self.accel[d]
            .as_ref()
            .expect("fill_complete was not called for this mode")
            .rowptr[r]
    }

    /// The full row-pointer slice for mode `d`, length `size(d) + 1`.
    pub fn rowptr_slice(&self, d: usize) -> &[usize] {
        &self.accel[d]
            .as_ref()
            .expect("fill_complete was not called for this mode")
            .rowptr
    }

    pub fn has_perm(&self, d: usize) -> bool {
        self.accel[d].is_some()
    }

    pub fn has_rowptr(&self, d: usize) -> bool {
        self.accel[d].as_ref().map(|a| !a.rowptr.is_empty()).unwrap_or(false)
    }
}

impl fmt::Display for SparseTensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SparseTensor(size={:?}, nnz={})",
            self.size,
            self.nnz()
        )
    }
}
