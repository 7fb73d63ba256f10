// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use std::error::Error;
use std::fmt;

use spten_core::CoreError;
use spten_sparse::SparseError;

/// Errors raised while reading or writing the text formats of `spec.md`
/// §6 (`sptensor`, `matrix`/`facmatrix`, `ktensor`).
#[derive(Debug)]
pub enum IOError {
    /// A parse failure: missing header, bad keyword, non-positive integer
    /// where a positive one was required, or the wrong number of fields.
    MalformedInput(String),
    /// The underlying file could not be opened, or compression was
    /// requested but the stream is not valid gzip.
    IOFailure(String),
}

impl fmt::Display for IOError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IOError::MalformedInput(msg) => write!(f, "*** spten-io: MalformedInput: {msg}"),
            IOError::IOFailure(msg) => write!(f, "*** spten-io: IOFailure: {msg}"),
        }
    }
}

impl Error for IOError {}

impl From<std::io::Error> for IOError {
    fn from(e: std::io::Error) -> Self {
        IOError::IOFailure(e.to_string())
    }
}

impl From<SparseError> for IOError {
    fn from(e: SparseError) -> Self {
        IOError::MalformedInput(e.to_string())
    }
}

impl From<CoreError> for IOError {
    fn from(e: CoreError) -> Self {
        IOError::MalformedInput(e.to_string())
    }
}

pub type IOResult<T> = Result<T, IOError>;
