// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

#![cfg_attr(not(feature = "fast-unsafe"), forbid(unsafe_code))]

//! MTTKRP (three storage-layout variants) and inner-product kernels,
//! dispatched through a `rayon` team/thread/vector hierarchy
//! (`spec.md` §5) with a compile-time rank-tiling ladder (`spec.md` §4.2).
//!
//! By default every kernel resolves concurrent scatter-add writes through
//! [`atomic_f64::AtomicF64`] and carries no `unsafe`. The `fast-unsafe`
//! feature turns on [`mttkrp::fast_unsafe`], a raw-pointer variant of the
//! permuted-COO kernel that skips the atomic retry loop for row writes
//! provably exclusive to one parallel block.

pub mod atomic_f64;
pub mod error;
pub mod innerprod;
pub mod mttkrp;
pub mod prelude;
pub mod tile;

pub use error::{KernelError, KernelResult};
pub use innerprod::inner_product;
pub use mttkrp::{mttkrp, mttkrp_coo, mttkrp_permuted, mttkrp_row_indexed};
