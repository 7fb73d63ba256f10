// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

//! A compare-and-swap-based atomic `f64` accumulator.
//!
//! `std::sync::atomic` has no `AtomicF64`; this follows the same
//! retry-loop shape as `dcl_data_structures`'s
//! `AtomicSequenceRelaxed::compare_and_swap`, bit-casting through
//! `AtomicU64` instead of guarding the value behind a lock. Used to
//! resolve the concurrent scatter-add writes of `spec.md` §4.2/§4.3
//! without requiring `unsafe`.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Atomically add `delta` to the stored value.
    pub fn fetch_add(&self, delta: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let new_bits = (f64::from_bits(current) + delta).to_bits();
            match self.0.compare_exchange_weak(
                current,
                new_bits,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn concurrent_fetch_add_sums_correctly() {
        let cell = AtomicF64::new(0.0);
        (0..1000).into_par_iter().for_each(|_| cell.fetch_add(1.0));
        assert_eq!(cell.load(), 1000.0);
    }
}
