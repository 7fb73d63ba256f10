// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

//! Readers and writers for the three text formats of `spec.md` §6.

use std::io::{BufRead, Write};

use spten_core::{FactorMatrix, KTensor};
use spten_sparse::SparseTensor;

use crate::error::{IOError, IOResult};
use crate::lines::{collect_token_lines, parse_f64, parse_positive_usize, parse_usize, single, Cursor};

const DEFAULT_DIGITS: usize = 15;

fn format_real(v: f64, digits: usize) -> String {
    format!("{v:.digits$e}")
}

fn join(fields: impl IntoIterator<Item = String>) -> String {
    fields.into_iter().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------
// sptensor
// ---------------------------------------------------------------------

/// Read a `sptensor` text file. `headerless_index_base` governs the
/// offset subtracted from every subscript when the input has no
/// `sptensor` header line (`spec.md` §6: "Default offset is then
/// governed by an `index_base` argument supplied by the caller").
pub fn read_sptensor<R: BufRead>(reader: R, headerless_index_base: usize) -> IOResult<SparseTensor> {
    let lines = collect_token_lines(reader)?;
    if lines.is_empty() {
        return Err(IOError::MalformedInput("empty sptensor input".into()));
    }

    if lines[0].first().map(String::as_str) == Some("sptensor") {
        let mut cur = Cursor::new(lines);
        let header = cur.next()?;
        let offset = if header.get(1).map(String::as_str) == Some("indices-start-at-one") {
            1
        } else {
            0
        };

        let ndims = parse_positive_usize(single(cur.next()?)?)?;
        let size_line = cur.next()?;
        if size_line.len() != ndims {
            return Err(IOError::MalformedInput(format!(
                "expected {ndims} mode sizes, got {}",
                size_line.len()
            )));
        }
        let size: Vec<usize> = size_line
            .iter()
            .map(|t| parse_positive_usize(t))
            .collect::<IOResult<_>>()?;

        let nnz = parse_usize(single(cur.next()?)?)?;
        let (subs, vals) = read_nonzero_lines(&mut cur, ndims, nnz, offset)?;
        Ok(SparseTensor::new(size, subs, vals)?)
    } else {
        let ndims = lines[0]
            .len()
            .checked_sub(1)
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                IOError::MalformedInput("headerless sptensor data line needs N+1 fields".into())
            })?;
        let nnz = lines.len();
        let mut cur = Cursor::new(lines);
        let (subs, vals) = read_nonzero_lines(&mut cur, ndims, nnz, headerless_index_base)?;

        let mut maxima = vec![0usize; ndims];
        for k in 0..nnz {
            for d in 0..ndims {
                maxima[d] = maxima[d].max(subs[k * ndims + d]);
            }
        }
        let size: Vec<usize> = maxima.iter().map(|&m| m + 1).collect();
        Ok(SparseTensor::new(size, subs, vals)?)
    }
}

fn read_nonzero_lines(
    cur: &mut Cursor,
    ndims: usize,
    nnz: usize,
    offset: usize,
) -> IOResult<(Vec<usize>, Vec<f64>)> {
    let mut subs = Vec::with_capacity(nnz * ndims);
    let mut vals = Vec::with_capacity(nnz);
    for _ in 0..nnz {
        let row = cur.next()?;
        if row.len() != ndims + 1 {
            return Err(IOError::MalformedInput(format!(
                "expected {} fields per nonzero, got {}",
                ndims + 1,
                row.len()
            )));
        }
        for d in 0..ndims {
            let raw = parse_usize(&row[d])?;
            let idx = raw.checked_sub(offset).ok_or_else(|| {
                IOError::MalformedInput(format!(
                    "subscript {raw} is below the index base {offset}"
                ))
            })?;
            subs.push(idx);
        }
        vals.push(parse_f64(&row[ndims])?);
    }
    Ok((subs, vals))
}

/// Write a `sptensor` text file, zero-based, with `digits` significant
/// digits in the nonzero values (default `%0.15e`, `spec.md` §6).
pub fn write_sptensor<W: Write>(mut writer: W, x: &SparseTensor, digits: usize) -> IOResult<()> {
    writeln!(writer, "sptensor")?;
    writeln!(writer, "{}", x.ndims())?;
    writeln!(writer, "{}", join(x.sizes().iter().map(|s| s.to_string())))?;
    writeln!(writer, "{}", x.nnz())?;
    for k in 0..x.nnz() {
        let mut fields: Vec<String> = (0..x.ndims()).map(|d| x.subscript(k, d).to_string()).collect();
        fields.push(format_real(x.value(k), digits));
        writeln!(writer, "{}", fields.join(" "))?;
    }
    Ok(())
}

/// [`write_sptensor`] with the default digit count.
pub fn write_sptensor_default<W: Write>(writer: W, x: &SparseTensor) -> IOResult<()> {
    write_sptensor(writer, x, DEFAULT_DIGITS)
}

// ---------------------------------------------------------------------
// matrix / facmatrix
// ---------------------------------------------------------------------

fn read_matrix_block(cur: &mut Cursor) -> IOResult<FactorMatrix> {
    let header = cur.next()?;
    match header.first().map(String::as_str) {
        Some("matrix") | Some("facmatrix") => {}
        _ => {
            return Err(IOError::MalformedInput(
                "expected a 'matrix' or 'facmatrix' header".into(),
            ))
        }
    }
    let tag = parse_usize(single(cur.next()?)?)?;
    if tag != 2 {
        return Err(IOError::MalformedInput(
            "matrix blocks are always 2-dimensional".into(),
        ));
    }
    let shape = cur.next()?;
    if shape.len() != 2 {
        return Err(IOError::MalformedInput("expected 'rows cols' line".into()));
    }
    let rows = parse_positive_usize(&shape[0])?;
    let cols = parse_positive_usize(&shape[1])?;

    let mut data = Vec::with_capacity(rows * cols);
    for _ in 0..rows {
        let row = cur.next()?;
        if row.len() != cols {
            return Err(IOError::MalformedInput(format!(
                "expected {cols} fields per matrix row, got {}",
                row.len()
            )));
        }
        for tok in row {
            data.push(parse_f64(tok)?);
        }
    }
    Ok(FactorMatrix::from_vec(rows, cols, data)?)
}

fn write_matrix_block<W: Write>(mut writer: W, m: &FactorMatrix, digits: usize) -> IOResult<()> {
    writeln!(writer, "matrix")?;
    writeln!(writer, "2")?;
    writeln!(writer, "{} {}", m.rows(), m.cols())?;
    for row in 0..m.rows() {
        writeln!(
            writer,
            "{}",
            join(m.row(row).iter().map(|v| format_real(*v, digits)))
        )?;
    }
    Ok(())
}

pub fn read_matrix<R: BufRead>(reader: R) -> IOResult<FactorMatrix> {
    let lines = collect_token_lines(reader)?;
    let mut cur = Cursor::new(lines);
    read_matrix_block(&mut cur)
}

pub fn write_matrix<W: Write>(writer: W, m: &FactorMatrix, digits: usize) -> IOResult<()> {
    write_matrix_block(writer, m, digits)
}

pub fn write_matrix_default<W: Write>(writer: W, m: &FactorMatrix) -> IOResult<()> {
    write_matrix_block(writer, m, DEFAULT_DIGITS)
}

// ---------------------------------------------------------------------
// ktensor
// ---------------------------------------------------------------------

pub fn read_ktensor<R: BufRead>(reader: R) -> IOResult<KTensor> {
    let lines = collect_token_lines(reader)?;
    if lines.first().and_then(|l| l.first()).map(String::as_str) != Some("ktensor") {
        return Err(IOError::MalformedInput("expected a 'ktensor' header".into()));
    }
    let mut cur = Cursor::new(lines);
    let _header = cur.next()?;

    let ndims = parse_positive_usize(single(cur.next()?)?)?;
    let size_line = cur.next()?;
    if size_line.len() != ndims {
        return Err(IOError::MalformedInput(format!(
            "expected {ndims} mode sizes, got {}",
            size_line.len()
        )));
    }
    let sizes: Vec<usize> = size_line
        .iter()
        .map(|t| parse_positive_usize(t))
        .collect::<IOResult<_>>()?;

    let rank = parse_positive_usize(single(cur.next()?)?)?;
    let lambda_line = cur.next()?;
    if lambda_line.len() != rank {
        return Err(IOError::MalformedInput(format!(
            "expected {rank} weights, got {}",
            lambda_line.len()
        )));
    }
    let weights: Vec<f64> = lambda_line.iter().map(|t| parse_f64(t)).collect::<IOResult<_>>()?;
    if weights.iter().any(|&w| w < 0.0) {
        return Err(IOError::MalformedInput(
            "ktensor weights must all be >= 0".into(),
        ));
    }

    let mut factors = Vec::with_capacity(ndims);
    for (d, &size) in sizes.iter().enumerate() {
        let f = read_matrix_block(&mut cur)?;
        if f.rows() != size || f.cols() != rank {
            return Err(IOError::MalformedInput(format!(
                "factor {d} has shape {}x{}, expected {}x{}",
                f.rows(),
                f.cols(),
                size,
                rank
            )));
        }
        factors.push(f);
    }
    Ok(KTensor::new(factors, weights)?)
}

pub fn write_ktensor<W: Write>(mut writer: W, k: &KTensor, digits: usize) -> IOResult<()> {
    writeln!(writer, "ktensor")?;
    writeln!(writer, "{}", k.ndims())?;
    writeln!(
        writer,
        "{}",
        join((0..k.ndims()).map(|d| k.factor(d).rows().to_string()))
    )?;
    writeln!(writer, "{}", k.rank())?;
    writeln!(writer, "{}", join(k.weights().iter().map(|v| format_real(*v, digits))))?;
    for d in 0..k.ndims() {
        write_matrix_block(&mut writer, k.factor(d), digits)?;
    }
    Ok(())
}

pub fn write_ktensor_default<W: Write>(writer: W, k: &KTensor) -> IOResult<()> {
    write_ktensor(writer, k, DEFAULT_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as IoCursor;

    #[test]
    fn sptensor_round_trip_with_header() {
        let x = SparseTensor::new(
            vec![2, 2, 2],
            vec![0, 0, 0, 1, 0, 1, 0, 1, 1],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();
        let mut buf = Vec::new();
        write_sptensor_default(&mut buf, &x).unwrap();
        let back = read_sptensor(IoCursor::new(buf), 0).unwrap();
        assert_eq!(back.sizes(), x.sizes());
        assert_eq!(back.nnz(), x.nnz());
        for k in 0..x.nnz() {
            assert_eq!(back.value(k), x.value(k));
        }
    }

    #[test]
    fn sptensor_headerless_infers_sizes_and_ndims() {
        let text = "0 0 1.0\n1 1 2.0\n// a comment\n\n2 1 3.0\n";
        let x = read_sptensor(IoCursor::new(text), 0).unwrap();
        assert_eq!(x.ndims(), 2);
        assert_eq!(x.nnz(), 3);
        assert_eq!(x.sizes(), &[3, 2]);
    }

    #[test]
    fn sptensor_honors_indices_start_at_one() {
        let text = "sptensor indices-start-at-one\n2\n2 2\n1\n1 1 5.0\n";
        let x = read_sptensor(IoCursor::new(text), 0).unwrap();
        assert_eq!(x.subscript(0, 0), 0);
        assert_eq!(x.subscript(0, 1), 0);
    }

    #[test]
    fn matrix_round_trip() {
        let m = FactorMatrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mut buf = Vec::new();
        write_matrix_default(&mut buf, &m).unwrap();
        let back = read_matrix(IoCursor::new(buf)).unwrap();
        assert_eq!(back.as_slice(), m.as_slice());
    }

    #[test]
    fn ktensor_round_trip_scenario_f() {
        let factors = vec![
            FactorMatrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            FactorMatrix::from_vec(3, 2, vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap(),
        ];
        let k = KTensor::new(factors, vec![1.5, 0.5]).unwrap();
        let mut buf = Vec::new();
        write_ktensor_default(&mut buf, &k).unwrap();
        let back = read_ktensor(IoCursor::new(buf)).unwrap();
        assert_eq!(back.weights(), k.weights());
        for d in 0..k.ndims() {
            for (a, b) in back.factor(d).as_slice().iter().zip(k.factor(d).as_slice()) {
                assert!((a - b).abs() < 1e-13);
            }
        }
    }

    #[test]
    fn malformed_header_is_rejected() {
        let err = read_sptensor(IoCursor::new("ktensor\n2\n"), 0).unwrap_err();
        // A "ktensor" first token with too few fields for a headerless
        // data line (ndims would be 0) must be rejected.
        assert!(matches!(err, IOError::MalformedInput(_)));
    }
}
