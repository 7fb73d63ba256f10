// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use spten_core::FactorMatrix;
use spten_kernels::{inner_product, mttkrp};
use spten_sparse::{Layout, SparseTensor};

/// A synthetic `dim x dim x dim` tensor with one nonzero per row of mode 0,
/// scattered across the other two modes. Deterministic (no RNG, per
/// `spec.md`'s non-goals), just large enough to separate the three layouts
/// under `criterion`'s statistics.
fn synthetic_tensor(dim: usize) -> SparseTensor {
    let mut subs = Vec::with_capacity(dim * 3);
    let mut vals = Vec::with_capacity(dim);
    for i in 0..dim {
        subs.push(i);
        subs.push((i * 7) % dim);
        subs.push((i * 13) % dim);
        vals.push(1.0 + (i % 5) as f64);
    }
    SparseTensor::new(vec![dim, dim, dim], subs, vals).unwrap()
}

fn synthetic_factors(dim: usize, rank: usize) -> Vec<FactorMatrix> {
    (0..3)
        .map(|_| {
            let data: Vec<f64> = (0..dim * rank).map(|i| 1.0 + (i % 7) as f64 * 0.1).collect();
            FactorMatrix::from_vec(dim, rank, data).unwrap()
        })
        .collect()
}

fn bench_mttkrp_layouts(c: &mut Criterion) {
    let dim = 2048;
    let rank = 16;
    let mut group = c.benchmark_group("mttkrp");

    for layout in [Layout::Coo, Layout::Permuted, Layout::RowIndexed] {
        let mut x = synthetic_tensor(dim);
        x.fill_complete(0, layout).unwrap();
        let factors = synthetic_factors(dim, rank);
        let refs: Vec<&FactorMatrix> = factors.iter().collect();
        let lambda = vec![1.0; rank];

        group.bench_with_input(BenchmarkId::from_parameter(format!("{layout:?}")), &layout, |b, &layout| {
            b.iter(|| mttkrp(black_box(&x), black_box(&refs), black_box(&lambda), 0, layout).unwrap());
        });
    }
    group.finish();
}

fn bench_inner_product(c: &mut Criterion) {
    let dim = 2048;
    let rank = 16;
    let x = synthetic_tensor(dim);
    let factors = synthetic_factors(dim, rank);
    let refs: Vec<&FactorMatrix> = factors.iter().collect();
    let lambda = vec![1.0; rank];

    c.bench_function("inner_product", |b| {
        b.iter(|| inner_product(black_box(&x), black_box(&refs), black_box(&lambda)).unwrap());
    });
}

criterion_group!(benches, bench_mttkrp_layouts, bench_inner_product);
criterion_main!(benches);
