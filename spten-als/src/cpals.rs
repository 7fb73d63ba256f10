// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use std::time::Instant;

use spten_core::{solve_pos_def, FactorMatrix, KTensor, NormKind};
use spten_kernels::{inner_product, mttkrp};
use spten_sparse::SparseTensor;

use crate::config::CpAlsConfig;
use crate::error::{CpAlsError, CpAlsResult};
use crate::perf::{CpAlsReport, PerfEntry};

fn check_preconditions(x: &SparseTensor, u: &KTensor) -> CpAlsResult<()> {
    if !u.is_consistent() {
        return Err(CpAlsError::ShapeMismatch(
            "K-tensor is not consistent: factor column counts disagree with its rank".into(),
        ));
    }
    if u.ndims() != x.ndims() {
        return Err(CpAlsError::ShapeMismatch(format!(
            "K-tensor has {} modes, sparse tensor has {}",
            u.ndims(),
            x.ndims()
        )));
    }
    for d in 0..u.ndims() {
        if u.factor(d).rows() != x.size(d) {
            return Err(CpAlsError::ShapeMismatch(format!(
                "factor {d} has {} rows, sparse tensor's mode {d} has size {}",
                u.factor(d).rows(),
                x.size(d)
            )));
        }
    }
    Ok(())
}

fn other_modes(ndims: usize, n: usize) -> Vec<usize> {
    (0..ndims).filter(|&m| m != n).collect()
}

/// Hadamard product of `gram[m]` for every `m` in `modes`. For a
/// single-mode tensor (`modes` empty), the empty Hadamard product is the
/// all-ones matrix, the identity element of elementwise multiplication.
fn hadamard_fold(gram: &[FactorMatrix], modes: &[usize], rank: usize) -> CpAlsResult<FactorMatrix> {
    let Some((&first, rest)) = modes.split_first() else {
        return Ok(FactorMatrix::from_vec(rank, rank, vec![1.0; rank * rank])?);
    };
    let mut acc = gram[first].clone();
    for &m in rest {
        acc = acc.hadamard(&gram[m])?;
    }
    Ok(acc)
}

fn assert_finite(f: &FactorMatrix) -> CpAlsResult<()> {
    if f.as_slice().iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(CpAlsError::NonFiniteValue(
            "factor matrix contains a NaN or infinite value after the solve step".into(),
        ))
    }
}

/// Fit a rank-`U.rank()` CP model to `x` in place, per `spec.md` §4.6.
///
/// `x` is mutated only through [`SparseTensor::fill_complete`] for
/// `config.layout`; `u` is the in/out K-tensor (`U_inout` in the spec's
/// public contract). Returns a [`CpAlsReport`] carrying the final
/// iteration count, residual norm, fit, and any periodic performance
/// samples requested via `config.perf_every`.
pub fn cpals(x: &mut SparseTensor, u: &mut KTensor, config: &CpAlsConfig) -> CpAlsResult<CpAlsReport> {
    check_preconditions(x, u)?;
    if config.tol <= 0.0 {
        return Err(CpAlsError::ShapeMismatch("tol must be > 0".into()));
    }
    if config.max_iters == 0 {
        return Err(CpAlsError::ShapeMismatch("max_iters must be >= 1".into()));
    }

    let ndims = u.ndims();
    for n in 0..ndims {
        x.fill_complete(n, config.layout)?;
    }

    let mut gram: Vec<FactorMatrix> = u.factors().iter().map(|f| f.gramian()).collect();

    let x_norm_sq = x.norm_squared();
    let x_norm = x_norm_sq.sqrt();

    let start = Instant::now();
    let mut report = CpAlsReport::default();
    let mut prev_fit: Option<f64> = None;
    let mut last_upsilon = gram[0].clone();

    for iter in 0..config.max_iters {
        report.num_iters = iter + 1;
        let flops_this_iter = 2.0 * (ndims.max(1) - 1).max(1) as f64 * x.nnz() as f64 * u.rank() as f64;

        for n in 0..ndims {
            let modes = other_modes(ndims, n);
            let factors: Vec<&FactorMatrix> = u.factors().iter().collect();
            let mut v = mttkrp(x, &factors, u.weights(), n, config.layout)?;

            let upsilon = hadamard_fold(&gram, &modes, u.rank())?;
            solve_pos_def(&upsilon, &mut v)?;
            assert_finite(&v)?;

            let (kind, floor) = if iter == 0 {
                (NormKind::L2, 0.0)
            } else {
                (NormKind::LInf, 1.0)
            };
            let mut norms = v.column_norms(kind, floor);
            for norm in norms.iter_mut() {
                if *norm == 0.0 {
                    *norm = 1.0;
                }
            }
            v.scale_columns_inv(&norms)?;
            u.set_factor(n, v)?;
            u.weights_mut().copy_from_slice(&norms);

            gram[n] = u.factor(n).gramian();
            if n == ndims - 1 {
                last_upsilon = upsilon;
            }
        }

        let lambda = u.weights();
        let last = ndims - 1;
        let r = lambda.len();
        let mut model_norm_sq = 0.0;
        for i in 0..r {
            for j in 0..r {
                model_norm_sq += last_upsilon.get(i, j) * gram[last].get(i, j) * lambda[i] * lambda[j];
            }
        }

        let factors: Vec<&FactorMatrix> = u.factors().iter().collect();
        let inner = inner_product(x, &factors, lambda)?;

        let residual_sq = x_norm_sq + model_norm_sq - 2.0 * inner;
        let res_norm = if residual_sq > 0.0 {
            residual_sq.sqrt()
        } else if residual_sq > -inner * f64::EPSILON.sqrt() * 1e3 {
            0.0
        } else {
            return Err(CpAlsError::NegativeResidualNorm(format!(
                "residual^2 = {residual_sq} is below the roundoff floor at outer iteration {iter}"
            )));
        };
        let fit = if x_norm > 0.0 {
            1.0 - res_norm / x_norm
        } else {
            1.0
        };

        report.res_norm = res_norm;
        report.fit = fit;

        let elapsed = start.elapsed().as_secs_f64();
        if config.perf_every > 0 && (iter + 1) % config.perf_every == 0 {
            report.iters.push(PerfEntry {
                iter: iter + 1,
                residual_norm: res_norm,
                fit,
                cumulative_secs: elapsed,
                mttkrp_gflops: if elapsed > 0.0 {
                    flops_this_iter / elapsed / 1e9
                } else {
                    0.0
                },
            });
        }

        let converged = iter > 0 && prev_fit.is_some_and(|p| (fit - p).abs() < config.tol);
        prev_fit = Some(fit);
        if converged {
            report.converged = true;
            break;
        }
        if elapsed > config.max_secs {
            break;
        }
    }

    if config.perf_every > 0 {
        let last_logged = report.iters.last().map(|e| e.iter).unwrap_or(0);
        if last_logged != report.num_iters {
            let elapsed = start.elapsed().as_secs_f64();
            report.iters.push(PerfEntry {
                iter: report.num_iters,
                residual_norm: report.res_norm,
                fit: report.fit,
                cumulative_secs: elapsed,
                mttkrp_gflops: 0.0,
            });
        }
    }

    // spec.md §4.6 "Post-processing": normalize to unit columns (folding
    // the removed norms into lambda), then sort components by descending
    // lambda. `distribute` is left for callers that want lambda absorbed
    // back into the first factor instead.
    u.normalize()?;
    u.sort_components_desc()?;

    Ok(report)
}
