// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

pub use crate::atomic_f64::AtomicF64;
pub use crate::error::{KernelError, KernelResult};
pub use crate::innerprod::inner_product;
pub use crate::mttkrp::{mttkrp, mttkrp_coo, mttkrp_permuted, mttkrp_row_indexed};
pub use crate::tile::{accumulate_row, reduce_row};

#[cfg(feature = "fast-unsafe")]
pub use crate::mttkrp::fast_unsafe::mttkrp_permuted_fast;
