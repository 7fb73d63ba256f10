// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

#![forbid(unsafe_code)]

//! Dense containers (factor matrix, K-tensor) and the small dense
//! linear-algebra layer shared by the sparse-tensor CP-ALS engine.

pub mod error;
pub mod factor_matrix;
pub mod ktensor;
pub mod linalg;
pub mod prelude;

pub use error::{CoreError, CoreResult};
pub use factor_matrix::{FactorMatrix, NormKind};
pub use ktensor::KTensor;
pub use linalg::{solve_pos_def, Cholesky};
