// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

//! Whitespace tokenization shared by every text format of `spec.md` §6:
//! blank lines and `//`-comment lines are dropped everywhere, and a
//! trailing `\r` is stripped -- the same "skip non-data lines, then read
//! a fixed sequence of fields" shape as
//! `genetics-statistics-rqtl2-geno-kinship-rust`'s `consume_comments2`,
//! generalized from comments-then-data to comments interleaved anywhere.

use std::io::BufRead;

use crate::error::{IOError, IOResult};

/// Read every non-blank, non-comment line of `reader`, split on
/// whitespace into tokens.
pub fn collect_token_lines<R: BufRead>(reader: R) -> IOResult<Vec<Vec<String>>> {
    let mut out = Vec::new();
    for line in reader.lines() {
        let mut line = line?;
        if line.ends_with('\r') {
            line.pop();
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        out.push(trimmed.split_whitespace().map(str::to_string).collect());
    }
    Ok(out)
}

/// A forward-only cursor over token lines, used to parse the fixed
/// sequence of header/shape/data lines each format specifies.
pub struct Cursor {
    lines: Vec<Vec<String>>,
    pos: usize,
}

impl Cursor {
    pub fn new(lines: Vec<Vec<String>>) -> Self {
        Self { lines, pos: 0 }
    }

    pub fn next(&mut self) -> IOResult<&[String]> {
        let line = self
            .lines
            .get(self.pos)
            .ok_or_else(|| IOError::MalformedInput("unexpected end of input".into()))?;
        self.pos += 1;
        Ok(line)
    }
}

pub fn single(tokens: &[String]) -> IOResult<&str> {
    if tokens.len() != 1 {
        return Err(IOError::MalformedInput(format!(
            "expected a single field, got {}",
            tokens.len()
        )));
    }
    Ok(&tokens[0])
}

pub fn parse_usize(tok: &str) -> IOResult<usize> {
    tok.parse::<usize>()
        .map_err(|_| IOError::MalformedInput(format!("expected a non-negative integer, got {tok:?}")))
}

pub fn parse_positive_usize(tok: &str) -> IOResult<usize> {
    let v = parse_usize(tok)?;
    if v == 0 {
        return Err(IOError::MalformedInput(format!(
            "expected a positive integer, got {tok:?}"
        )));
    }
    Ok(v)
}

pub fn parse_f64(tok: &str) -> IOResult<f64> {
    tok.parse::<f64>()
        .map_err(|_| IOError::MalformedInput(format!("expected a real number, got {tok:?}")))
}
