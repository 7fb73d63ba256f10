// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

//! Path-based convenience wrappers implementing the `gz=true` variant of
//! `spec.md` §6: "the same text format is read through a gzip
//! decompression filter."

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::IOResult;

/// Open `path` for buffered reading, transparently decompressing if `gz`
/// is set.
pub fn open_reader(path: &Path, gz: bool) -> IOResult<Box<dyn std::io::BufRead>> {
    let file = File::open(path)?;
    if gz {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Create (or truncate) `path` for buffered writing, transparently
/// gzip-compressing if `gz` is set.
pub fn create_writer(path: &Path, gz: bool) -> IOResult<Box<dyn Write>> {
    let file = File::create(path)?;
    if gz {
        Ok(Box::new(GzEncoder::new(file, Compression::default())))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}
