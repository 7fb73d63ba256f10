// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

pub use crate::error::{CoreError, CoreResult};
pub use crate::factor_matrix::{FactorMatrix, NormKind};
pub use crate::ktensor::KTensor;
pub use crate::linalg::{solve_pos_def, Cholesky};
