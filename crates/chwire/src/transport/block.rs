// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Block framing, compression and the pull reader over decompressed blocks.

use super::cityhash::{city_hash128, Hash128};
use crate::codec::ByteSource;
use crate::config::WireConfig;
use crate::error::{Error, Result, StreamError};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

/// Read step for block bodies.
const BODY_CHUNK: usize = 64 * 1024;

/// Compression method tag of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "config-loaders",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum CompressionMethod {
    /// Payload stored verbatim.
    None,
    /// LZ4 block format.
    #[default]
    Lz4,
    /// Zstandard frame.
    #[cfg(feature = "zstd")]
    Zstd,
}

impl CompressionMethod {
    pub const fn tag(self) -> u8 {
        match self {
            Self::None => 0x02,
            Self::Lz4 => 0x82,
            #[cfg(feature = "zstd")]
            Self::Zstd => 0x90,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x02 => Some(Self::None),
            0x82 => Some(Self::Lz4),
            #[cfg(feature = "zstd")]
            0x90 => Some(Self::Zstd),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            #[cfg(feature = "zstd")]
            Self::Zstd => "zstd",
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lz4" => Ok(Self::Lz4),
            #[cfg(feature = "zstd")]
            "zstd" => Ok(Self::Zstd),
            other => Err(format!("unknown compression method '{}'", other)),
        }
    }
}

/// Fixed 25-byte block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub checksum: Hash128,
    /// Raw method tag; may be unknown.
    pub method: u8,
    /// Payload length plus [`BlockHeader::SUB_HEADER`].
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl BlockHeader {
    pub const SIZE: usize = 25;
    /// Method byte and both sizes; the part covered by the checksum.
    pub const SUB_HEADER: usize = 9;

    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.checksum.to_le_bytes())?;
        w.write_u8(self.method)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        Ok(())
    }

    pub fn parse(raw: &[u8; Self::SIZE]) -> Self {
        let mut checksum = [0u8; 16];
        checksum.copy_from_slice(&raw[..16]);
        let mut compressed = [0u8; 4];
        compressed.copy_from_slice(&raw[17..21]);
        let mut uncompressed = [0u8; 4];
        uncompressed.copy_from_slice(&raw[21..25]);
        Self {
            checksum: Hash128::from_le_bytes(checksum),
            method: raw[16],
            compressed_size: u32::from_le_bytes(compressed),
            uncompressed_size: u32::from_le_bytes(uncompressed),
        }
    }
}

/// Frame `data` as one complete block.
pub fn encode_block(method: CompressionMethod, data: &[u8], zstd_level: i32) -> Result<Vec<u8>> {
    let payload = match method {
        CompressionMethod::None => data.to_vec(),
        CompressionMethod::Lz4 => lz4_flex::block::compress(data),
        #[cfg(feature = "zstd")]
        CompressionMethod::Zstd => zstd::bulk::compress(data, zstd_level)?,
    };
    #[cfg(not(feature = "zstd"))]
    let _ = zstd_level;

    let too_large = |declared: usize| StreamError::BlockTooLarge {
        declared,
        limit: u32::MAX as usize,
    };
    let compressed_size = u32::try_from(payload.len() + BlockHeader::SUB_HEADER)
        .map_err(|_| too_large(payload.len() + BlockHeader::SUB_HEADER))?;
    let uncompressed_size = u32::try_from(data.len()).map_err(|_| too_large(data.len()))?;

    let mut header = BlockHeader {
        checksum: Hash128 { low: 0, high: 0 },
        method: method.tag(),
        compressed_size,
        uncompressed_size,
    };
    let mut out = Vec::with_capacity(BlockHeader::SIZE + payload.len());
    header.write(&mut out)?;
    out.extend_from_slice(&payload);
    header.checksum = city_hash128(&out[16..]);
    out[..16].copy_from_slice(&header.checksum.to_le_bytes());
    Ok(out)
}

fn to_io(e: Error) -> io::Error {
    match e {
        Error::Stream(StreamError::Io(e)) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// Pull reader over the decompressed contents of a block stream.
///
/// A block is verified in full before any of its bytes are handed out. Any
/// error leaves the reader unusable; open a new one for the next stream.
pub struct BlockReader<R> {
    inner: R,
    block: Vec<u8>,
    offset: usize,
    /// Decompressed bytes handed out.
    position: u64,
    /// Raw bytes consumed from `inner`.
    stream_offset: u64,
    blocks_read: u64,
    max_compressed_size: usize,
}

impl<R: Read> BlockReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, &WireConfig::default())
    }

    pub fn with_config(inner: R, config: &WireConfig) -> Self {
        Self {
            inner,
            block: Vec::new(),
            offset: 0,
            position: 0,
            stream_offset: 0,
            blocks_read: 0,
            max_compressed_size: config.max_compressed_size,
        }
    }

    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Fill `buf` from the raw stream; running short is corruption.
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.stream_offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(StreamError::UnexpectedEof {
                offset: self.stream_offset,
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sub-header plus payload. Grows in bounded steps so a corrupt size
    /// field fails on EOF before it can reserve the whole declared length.
    fn read_body(&mut self, sub_header: &[u8], compressed: usize) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(compressed.min(BODY_CHUNK));
        body.extend_from_slice(sub_header);
        while body.len() < compressed {
            let start = body.len();
            let step = (compressed - start).min(BODY_CHUNK);
            body.resize(start + step, 0);
            self.read_raw(&mut body[start..])?;
        }
        Ok(body)
    }

    /// First header byte, or `None` when the stream ends cleanly between blocks.
    fn read_first(&mut self) -> Result<Option<u8>> {
        let mut b = [0u8; 1];
        loop {
            match self.inner.read(&mut b) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.stream_offset += 1;
                    return Ok(Some(b[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Load the next non-empty block. `false` at end of stream.
    fn next_block(&mut self) -> Result<bool> {
        loop {
            let start = self.stream_offset;
            let mut raw = [0u8; BlockHeader::SIZE];
            match self.read_first()? {
                Some(b) => raw[0] = b,
                None => return Ok(false),
            }
            self.read_raw(&mut raw[1..])?;
            let header = BlockHeader::parse(&raw);

            let method = CompressionMethod::from_tag(header.method)
                .ok_or(StreamError::UnknownMethod(header.method))?;
            let compressed = header.compressed_size as usize;
            let uncompressed = header.uncompressed_size as usize;
            for declared in [compressed, uncompressed] {
                if declared > self.max_compressed_size {
                    return Err(StreamError::BlockTooLarge {
                        declared,
                        limit: self.max_compressed_size,
                    }
                    .into());
                }
            }
            if compressed < BlockHeader::SUB_HEADER {
                return Err(StreamError::Decompress(format!(
                    "compressed size {} is smaller than the {}-byte header",
                    compressed,
                    BlockHeader::SUB_HEADER
                ))
                .into());
            }

            let body = self.read_body(&raw[16..], compressed)?;
            if city_hash128(&body) != header.checksum {
                return Err(StreamError::ChecksumMismatch { offset: start }.into());
            }

            let payload = &body[BlockHeader::SUB_HEADER..];
            self.block.clear();
            match method {
                CompressionMethod::None => self.block.extend_from_slice(payload),
                CompressionMethod::Lz4 => {
                    self.block.resize(uncompressed, 0);
                    let n = lz4_flex::block::decompress_into(payload, &mut self.block)
                        .map_err(|e| StreamError::Decompress(e.to_string()))?;
                    self.block.truncate(n);
                }
                #[cfg(feature = "zstd")]
                CompressionMethod::Zstd => {
                    self.block = zstd::bulk::decompress(payload, uncompressed)
                        .map_err(|e| StreamError::Decompress(e.to_string()))?;
                }
            }
            if self.block.len() != uncompressed {
                return Err(StreamError::SizeMismatch {
                    expected: uncompressed,
                    actual: self.block.len(),
                }
                .into());
            }

            self.offset = 0;
            self.blocks_read += 1;
            log::debug!(
                "[chwire] block #{} at offset {}: method={} compressed={} uncompressed={}",
                self.blocks_read,
                start,
                method,
                compressed,
                uncompressed
            );
            if !self.block.is_empty() {
                return Ok(true);
            }
        }
    }

    fn available(&self) -> &[u8] {
        &self.block[self.offset..]
    }
}

impl<R: Read> Read for BlockReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.available().is_empty() && !self.next_block().map_err(to_io)? {
            return Ok(0);
        }
        let n = self.available().len().min(buf.len());
        buf[..n].copy_from_slice(&self.block[self.offset..self.offset + n]);
        self.offset += n;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read> ByteSource for BlockReader<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.position;
        let mut filled = 0;
        while filled < buf.len() {
            if self.available().is_empty() && !self.next_block()? {
                return Err(StreamError::UnexpectedEof { offset: start }.into());
            }
            let n = self.available().len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&self.block[self.offset..self.offset + n]);
            self.offset += n;
            self.position += n as u64;
            filled += n;
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        if self.available().is_empty() && !self.next_block()? {
            return Ok(None);
        }
        Ok(self.available().first().copied())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn copy_to(&mut self, sink: &mut dyn Write) -> Result<u64> {
        let mut total = 0u64;
        loop {
            let chunk = &self.block[self.offset..];
            if !chunk.is_empty() {
                sink.write_all(chunk)?;
                total += chunk.len() as u64;
                self.position += chunk.len() as u64;
                self.offset = self.block.len();
            }
            if !self.next_block()? {
                return Ok(total);
            }
        }
    }
}

/// Buffers written bytes and emits them as blocks of at most
/// `max_block_size` uncompressed bytes. Call [`finish`](Self::finish) to
/// write the last partial block.
pub struct BlockWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
    method: CompressionMethod,
    max_block_size: usize,
    zstd_level: i32,
    blocks_written: u64,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, &WireConfig::default())
    }

    pub fn with_config(inner: W, config: &WireConfig) -> Self {
        let max_block_size = config.max_block_size.clamp(1, u32::MAX as usize);
        Self {
            inner,
            pending: Vec::with_capacity(max_block_size.min(1 << 20)),
            method: config.compression,
            max_block_size,
            zstd_level: config.zstd_level,
            blocks_written: 0,
        }
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let block = encode_block(self.method, &self.pending, self.zstd_level)?;
        self.inner.write_all(&block)?;
        self.blocks_written += 1;
        log::debug!(
            "[chwire] wrote block #{}: method={} compressed={} uncompressed={}",
            self.blocks_written,
            self.method,
            block.len() - 16,
            self.pending.len()
        );
        self.pending.clear();
        Ok(())
    }

    /// Emit the pending block, flush, and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.flush_block()?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for BlockWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.max_block_size - self.pending.len();
        let n = room.min(buf.len());
        self.pending.extend_from_slice(&buf[..n]);
        if self.pending.len() >= self.max_block_size {
            self.flush_block().map_err(to_io)?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_block().map_err(to_io)?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 ^ (i / 997) as u8).collect()
    }

    fn write_stream(config: &WireConfig, data: &[u8]) -> Vec<u8> {
        let mut writer = BlockWriter::with_config(Vec::new(), config);
        writer.write_all(data).expect("write");
        writer.finish().expect("finish")
    }

    #[test]
    fn test_header_layout() {
        let block = encode_block(CompressionMethod::None, b"abc", 0).expect("encode");
        assert_eq!(block.len(), BlockHeader::SIZE + 3);
        assert_eq!(block[16], 0x02);
        assert_eq!(&block[17..21], &12u32.to_le_bytes());
        assert_eq!(&block[21..25], &3u32.to_le_bytes());
        assert_eq!(&block[25..], b"abc");
        assert_eq!(&block[..16], &city_hash128(&block[16..]).to_le_bytes());
    }

    #[test]
    fn test_round_trip_per_method() {
        let data = sample(100_000);
        let mut methods = vec![CompressionMethod::None, CompressionMethod::Lz4];
        #[cfg(feature = "zstd")]
        methods.push(CompressionMethod::Zstd);
        for method in methods {
            let config = WireConfig::new().compression(method).max_block_size(30_000);
            let stream = write_stream(&config, &data);
            let mut reader = BlockReader::new(stream.as_slice());
            let mut out = Vec::new();
            reader.read_to_end(&mut out).expect("read");
            assert_eq!(out, data, "{method}");
            assert_eq!(reader.blocks_read(), 4);
        }
    }

    #[test]
    fn test_reads_span_block_boundaries() {
        let data = sample(1000);
        let stream = write_stream(&WireConfig::new().max_block_size(7), &data);
        let mut reader = BlockReader::new(stream.as_slice());
        let mut buf = [0u8; 100];
        ByteSource::read_exact(&mut reader, &mut buf).expect("read");
        assert_eq!(&buf[..], &data[..100]);
        assert_eq!(reader.peek().expect("peek"), Some(data[100]));
        let mut rest = Vec::new();
        assert_eq!(reader.copy_to(&mut rest).expect("copy"), 900);
        assert_eq!(rest, &data[100..]);
        assert_eq!(reader.position(), 1000);
        assert_eq!(reader.peek().expect("peek"), None);
    }

    #[test]
    fn test_empty_stream_and_empty_block() {
        let mut reader = BlockReader::new(&[][..]);
        assert_eq!(reader.peek().expect("peek"), None);

        let mut stream = encode_block(CompressionMethod::Lz4, b"", 0).expect("encode");
        stream.extend(encode_block(CompressionMethod::None, b"xy", 0).expect("encode"));
        let mut reader = BlockReader::new(stream.as_slice());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).expect("read");
        assert_eq!(out, b"xy");
    }

    #[test]
    fn test_short_read_past_last_block() {
        let stream = encode_block(CompressionMethod::None, b"abc", 0).expect("encode");
        let mut reader = BlockReader::new(stream.as_slice());
        let mut head = [0u8; 2];
        ByteSource::read_exact(&mut reader, &mut head).expect("head");
        let mut buf = [0u8; 4];
        let err = ByteSource::read_exact(&mut reader, &mut buf).unwrap_err();
        assert!(matches!(err, Error::Stream(StreamError::UnexpectedEof { offset: 2 })));
    }

    #[test]
    fn test_truncated_header_and_payload() {
        let stream = encode_block(CompressionMethod::Lz4, &sample(500), 0).expect("encode");
        for cut in [10, BlockHeader::SIZE, stream.len() - 1] {
            let mut reader = BlockReader::new(&stream[..cut]);
            let err = reader.peek().unwrap_err();
            assert!(err.is_eof(), "cut at {cut}: {err}");
        }
    }

    #[test]
    fn test_oversized_claim_on_short_stream_is_eof() {
        let header = BlockHeader {
            checksum: Hash128 { low: 0, high: 0 },
            method: CompressionMethod::None.tag(),
            compressed_size: 512 << 20,
            uncompressed_size: 16,
        };
        let mut stream = Vec::new();
        header.write(&mut stream).expect("header");
        stream.extend_from_slice(&[0u8; 10]);
        let err = BlockReader::new(stream.as_slice()).peek().unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(StreamError::UnexpectedEof { offset: 25 })
        ));
    }

    #[test]
    fn test_flipped_payload_byte_fails_checksum() {
        let stream = encode_block(CompressionMethod::Lz4, &sample(2000), 0).expect("encode");
        for pos in [BlockHeader::SIZE, BlockHeader::SIZE + 17, stream.len() - 1] {
            let mut corrupt = stream.clone();
            corrupt[pos] ^= 0x40;
            let err = BlockReader::new(corrupt.as_slice()).peek().unwrap_err();
            assert!(
                matches!(err, Error::Stream(StreamError::ChecksumMismatch { offset: 0 })),
                "byte {pos}: {err}"
            );
        }
    }

    #[test]
    fn test_unknown_method() {
        let mut stream = encode_block(CompressionMethod::None, b"abc", 0).expect("encode");
        stream[16] = 0x55;
        let err = BlockReader::new(stream.as_slice()).peek().unwrap_err();
        assert!(matches!(err, Error::Stream(StreamError::UnknownMethod(0x55))));
    }

    #[test]
    fn test_declared_size_must_match() {
        let mut stream = encode_block(CompressionMethod::None, b"abcd", 0).expect("encode");
        stream[21..25].copy_from_slice(&5u32.to_le_bytes());
        let checksum = city_hash128(&stream[16..]);
        stream[..16].copy_from_slice(&checksum.to_le_bytes());
        let err = BlockReader::new(stream.as_slice()).peek().unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(StreamError::SizeMismatch { expected: 5, actual: 4 })
        ));
    }

    #[test]
    fn test_block_size_limit() {
        let stream = encode_block(CompressionMethod::None, &sample(64), 0).expect("encode");
        let config = WireConfig::new().max_compressed_size(32);
        let err = BlockReader::with_config(stream.as_slice(), &config).peek().unwrap_err();
        assert!(matches!(err, Error::Stream(StreamError::BlockTooLarge { declared: 73, limit: 32 })));
    }

    #[test]
    fn test_io_read_surfaces_corruption() {
        let mut stream = encode_block(CompressionMethod::None, b"abc", 0).expect("encode");
        stream[25] = b'z';
        let mut out = Vec::new();
        let err = BlockReader::new(stream.as_slice()).read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_method_names() {
        assert_eq!("LZ4".parse::<CompressionMethod>(), Ok(CompressionMethod::Lz4));
        assert!("brotli".parse::<CompressionMethod>().is_err());
        assert_eq!(CompressionMethod::from_tag(0x82), Some(CompressionMethod::Lz4));
        assert_eq!(CompressionMethod::None.to_string(), "none");
    }
}
