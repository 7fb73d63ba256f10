// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

pub use crate::error::{IOError, IOResult};
pub use crate::gz::{create_writer, open_reader};
pub use crate::text::{
    read_ktensor, read_matrix, read_sptensor, write_ktensor, write_ktensor_default, write_matrix,
    write_matrix_default, write_sptensor, write_sptensor_default,
};
