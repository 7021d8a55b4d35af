// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Compressed block stream end to end: rows through blocks, randomized
// corruption, and file-backed streams.

use chwire::codec::CodecOptions;
use chwire::transport::{encode_block, BlockHeader, BlockReader, BlockWriter, CompressionMethod};
use chwire::{Error, RowReader, RowWriter, Schema, StreamError, Value, WireConfig};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

fn rows(n: u32) -> Vec<Vec<Value>> {
    (0..n)
        .map(|i| {
            vec![
                Value::UInt32(i),
                Value::from(format!("row-{i}")),
                Value::Array((0..i % 5).map(|j| Value::Int64(i64::from(j) - 2)).collect()),
            ]
        })
        .collect()
}

fn schema() -> Schema {
    Schema::parse("id UInt32, label String, deltas Array(Int64)").expect("schema")
}

fn encode_rows(config: &WireConfig, data: &[Vec<Value>]) -> Vec<u8> {
    let blocks = BlockWriter::with_config(Vec::new(), config);
    let mut writer =
        RowWriter::with_header(blocks, schema(), CodecOptions::default()).expect("writer");
    for row in data {
        writer.write_row(row).expect("row");
    }
    writer.into_inner().finish().expect("finish")
}

#[test]
fn rows_survive_many_small_blocks() {
    let data = rows(500);
    let config = WireConfig::new().max_block_size(256).with_header(true);
    let stream = encode_rows(&config, &data);

    let reader = RowReader::with_header(BlockReader::new(stream.as_slice()), CodecOptions::default())
        .expect("header");
    assert_eq!(reader.schema().names(), &["id", "label", "deltas"]);
    let decoded: Vec<_> = reader.collect::<chwire::Result<_>>().expect("rows");
    assert_eq!(decoded, data);
}

#[test]
fn any_flipped_payload_byte_is_a_checksum_error() {
    let mut payload = Vec::new();
    for row in rows(50) {
        payload.extend_from_slice(format!("{row:?}").as_bytes());
    }
    let mut methods = vec![CompressionMethod::None, CompressionMethod::Lz4];
    #[cfg(feature = "zstd")]
    methods.push(CompressionMethod::Zstd);

    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for method in methods {
        let block = encode_block(method, &payload, 1).expect("encode");
        for _ in 0..200 {
            let pos = rng.usize(BlockHeader::SIZE..block.len());
            let mut corrupt = block.clone();
            corrupt[pos] ^= rng.u8(1..=255);
            let mut out = Vec::new();
            let mut reader = BlockReader::new(corrupt.as_slice());
            let err = chwire::codec::ByteSource::copy_to(&mut reader, &mut out).unwrap_err();
            assert!(
                matches!(err, Error::Stream(StreamError::ChecksumMismatch { offset: 0 })),
                "{method} byte {pos}: {err}"
            );
            assert!(out.is_empty());
        }
    }
}

#[test]
fn corruption_in_later_block_reports_its_offset() {
    let first = encode_block(CompressionMethod::None, b"first", 0).expect("encode");
    let mut second = encode_block(CompressionMethod::Lz4, &[7u8; 400], 0).expect("encode");
    let last = second.len() - 1;
    second[last] ^= 0xFF;
    let mut stream = first.clone();
    stream.extend_from_slice(&second);

    let mut reader = BlockReader::new(stream.as_slice());
    let mut head = [0u8; 5];
    reader.read_exact(&mut head).expect("first block");
    assert_eq!(&head, b"first");
    let err = chwire::codec::ByteSource::peek(&mut reader).unwrap_err();
    assert!(matches!(
        err,
        Error::Stream(StreamError::ChecksumMismatch { offset }) if offset == first.len() as u64
    ));
}

#[test]
fn truncated_stream_mid_row_names_column() {
    let config = WireConfig::new().compression(CompressionMethod::Lz4);
    let full = encode_rows(&config, &rows(3));
    // Re-frame only a prefix of the decompressed bytes so the last row is cut.
    let mut plain = Vec::new();
    BlockReader::new(full.as_slice())
        .read_to_end(&mut plain)
        .expect("decompress");
    let cut = encode_block(CompressionMethod::Lz4, &plain[..plain.len() - 3], 0).expect("encode");

    let mut reader =
        RowReader::with_header(BlockReader::new(cut.as_slice()), CodecOptions::default())
            .expect("header");
    assert!(reader.next().expect("row 0").is_ok());
    assert!(reader.next().expect("row 1").is_ok());
    let err = reader.next().expect("row 2").unwrap_err();
    assert!(matches!(
        err,
        Error::Stream(StreamError::TruncatedRow { row: 2, .. })
    ));
}

#[test]
fn file_backed_stream() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rows.bin");
    let data = rows(100);

    let file = BufWriter::new(File::create(&path).expect("create"));
    let mut writer = RowWriter::new(
        BlockWriter::with_config(file, &WireConfig::new().max_block_size(1024)),
        schema(),
        CodecOptions::default(),
    );
    for row in &data {
        writer.write_row(row).expect("row");
    }
    writer.into_inner().finish().expect("finish").flush().expect("flush");

    let file = BufReader::new(File::open(&path).expect("open"));
    let reader = RowReader::new(BlockReader::new(file), schema(), CodecOptions::default());
    assert_eq!(reader.collect::<chwire::Result<Vec<_>>>().expect("rows"), data);
}

#[test]
fn stored_block_fixture_checksum_is_pinned() {
    let payload: Vec<u8> = (0..300u32).map(|i| (i * 31 + 7) as u8).collect();
    let mut fixture = Vec::new();
    fixture.extend_from_slice(&0x6649ebd62c9ddf0b_u64.to_le_bytes());
    fixture.extend_from_slice(&0x256f1cfe41384df1_u64.to_le_bytes());
    fixture.push(0x02);
    fixture.extend_from_slice(&309u32.to_le_bytes());
    fixture.extend_from_slice(&300u32.to_le_bytes());
    fixture.extend_from_slice(&payload);

    assert_eq!(
        encode_block(CompressionMethod::None, &payload, 0).expect("encode"),
        fixture
    );
    let mut out = Vec::new();
    BlockReader::new(fixture.as_slice())
        .read_to_end(&mut out)
        .expect("decode");
    assert_eq!(out, payload);
}
