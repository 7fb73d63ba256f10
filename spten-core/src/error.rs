// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use std::error::Error;
use std::fmt;

/// Errors raised by the dense factor-matrix / K-tensor / linear-algebra layer.
///
/// Every variant carries a human-readable detail string; `Display` renders
/// the `*** component: invariant` form used throughout the workspace so that
/// a caller can surface the message verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Two shapes that were required to agree did not (factor rows vs mode
    /// size, output rows vs target mode size, ...).
    ShapeMismatch(String),
    /// Two or more factor matrices disagree on column count (rank).
    RankMismatch(String),
    /// A symmetric matrix that was expected to be positive definite was
    /// numerically singular during Cholesky factorization.
    SingularMatrix(String),
    /// A NaN or infinite value was found where a finite real was required.
    NonFiniteValue(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CoreError::ShapeMismatch(msg) => write!(f, "*** spten-core: ShapeMismatch: {msg}"),
            CoreError::RankMismatch(msg) => write!(f, "*** spten-core: RankMismatch: {msg}"),
            CoreError::SingularMatrix(msg) => write!(f, "*** spten-core: SingularMatrix: {msg}"),
            CoreError::NonFiniteValue(msg) => write!(f, "*** spten-core: NonFiniteValue: {msg}"),
        }
    }
}

impl Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;
