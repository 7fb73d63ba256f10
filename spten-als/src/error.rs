// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use std::error::Error;
use std::fmt;

use spten_core::CoreError;
use spten_kernels::KernelError;

/// Errors raised by the CP-ALS driver, composing the lower-level
/// `spten-core` and `spten-kernels` error taxonomies (`spec.md` §7)
/// instead of boxing them behind `Box<dyn Error>`.
#[derive(Debug, Clone, PartialEq)]
pub enum CpAlsError {
    /// Propagated from a `spten-core` operation (K-tensor consistency,
    /// factor-matrix shape, ...) that is not itself a singular-solve.
    Core(CoreError),
    /// Propagated from an MTTKRP or inner-product call.
    Kernel(KernelError),
    /// The sparse tensor and the K-tensor disagree on `ndims` or a mode's
    /// size, or the two do not share the same rank.
    ShapeMismatch(String),
    /// The normal-equations coefficient Upsilon was numerically singular
    /// during the Cholesky solve of `spec.md` §4.6.c.
    SingularNormalEquations(String),
    /// `residual^2` fell below the small-negative roundoff threshold of
    /// `spec.md` §4.6.3, indicating corruption rather than roundoff.
    NegativeResidualNorm(String),
    /// A NaN or infinite value appeared in a factor matrix between outer
    /// iterations (the optional guard of `spec.md` §7).
    NonFiniteValue(String),
}

impl fmt::Display for CpAlsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CpAlsError::Core(e) => write!(f, "*** spten-als: Core: {e}"),
            CpAlsError::Kernel(e) => write!(f, "*** spten-als: Kernel: {e}"),
            CpAlsError::ShapeMismatch(msg) => write!(f, "*** spten-als: ShapeMismatch: {msg}"),
            CpAlsError::SingularNormalEquations(msg) => {
                write!(f, "*** spten-als: SingularNormalEquations: {msg}")
            }
            CpAlsError::NegativeResidualNorm(msg) => {
                write!(f, "*** spten-als: NegativeResidualNorm: {msg}")
            }
            CpAlsError::NonFiniteValue(msg) => write!(f, "*** spten-als: NonFiniteValue: {msg}"),
        }
    }
}

impl Error for CpAlsError {}

impl From<CoreError> for CpAlsError {
    fn from(e: CoreError) -> Self {
        // A singular Cholesky pivot one layer down is exactly the
        // `SingularNormalEquations` condition of `spec.md` §4.6.c.
        match e {
            CoreError::SingularMatrix(msg) => CpAlsError::SingularNormalEquations(msg),
            other => CpAlsError::Core(other),
        }
    }
}

impl From<KernelError> for CpAlsError {
    fn from(e: KernelError) -> Self {
        CpAlsError::Kernel(e)
    }
}

pub type CpAlsResult<T> = Result<T, CpAlsError>;
