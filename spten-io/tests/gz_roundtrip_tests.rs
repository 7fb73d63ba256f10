// SPDX-License-Identifier: MIT
// Copyright (c) "2026" . The spten Authors and Contributors. All Rights Reserved.

use std::io::Read;

use spten_core::FactorMatrix;
use spten_io::{create_writer, open_reader, read_matrix, write_matrix_default};

#[test]
fn matrix_round_trips_through_gzip() {
    let path = std::env::temp_dir().join("spten-io-gz-roundtrip-test.matrix.gz");

    let m = FactorMatrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    {
        let writer = create_writer(&path, true).unwrap();
        write_matrix_default(writer, &m).unwrap();
    }

    // Sanity check: the file on disk is not plain text (it's gzip-framed).
    let mut raw = Vec::new();
    std::fs::File::open(&path)
        .unwrap()
        .read_to_end(&mut raw)
        .unwrap();
    assert_eq!(&raw[0..2], &[0x1f, 0x8b]);

    let reader = open_reader(&path, true).unwrap();
    let back = read_matrix(reader).unwrap();
    assert_eq!(back.as_slice(), m.as_slice());

    let _ = std::fs::remove_file(&path);
}
