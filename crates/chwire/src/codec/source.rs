// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte sources the codecs decode from.
//!
//! [`ByteSource`] is the minimal pull interface: read exactly N bytes or fail,
//! peek one byte, and forward the remainder in bulk. It is implemented for
//! in-memory slices ([`SliceSource`]), any buffered reader ([`IoSource`]) and
//! the compressed block stream ([`BlockReader`](crate::transport::BlockReader)).

use super::varint::MAX_VARINT_LEN;
use crate::error::{Result, StreamError};
use std::io::{self, BufRead, Write};

/// Allocation step for length-prefixed reads, so a corrupt length cannot force
/// one huge allocation before the stream runs out.
const READ_CHUNK: usize = 64 * 1024;

pub trait ByteSource {
    /// Fill `buf` completely, or fail with [`StreamError::UnexpectedEof`].
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Next byte without consuming it; `None` at a clean end of stream.
    fn peek(&mut self) -> Result<Option<u8>>;

    /// Bytes consumed so far.
    fn position(&self) -> u64;

    /// Forward every remaining byte to `sink`, returning the count.
    fn copy_to(&mut self, sink: &mut dyn Write) -> Result<u64>;

    fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(READ_CHUNK));
        while out.len() < len {
            let start = out.len();
            let step = (len - start).min(READ_CHUNK);
            out.resize(start + step, 0);
            self.read_exact(&mut out[start..])?;
        }
        Ok(out)
    }

    fn read_varint(&mut self) -> Result<u64> {
        let start = self.position();
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            let data = u64::from(byte & 0x7F);
            if i == MAX_VARINT_LEN - 1 && data > 1 {
                break;
            }
            value |= data << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(StreamError::VarintOverflow { offset: start }.into())
    }
}

/// Read a fixed-size array.
pub fn read_array<const N: usize, S: ByteSource + ?Sized>(src: &mut S) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    src.read_exact(&mut buf)?;
    Ok(buf)
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        (**self).peek()
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn copy_to(&mut self, sink: &mut dyn Write) -> Result<u64> {
        (**self).copy_to(sink)
    }
}

/// Bounds-checked cursor over a borrowed buffer.
pub struct SliceSource<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}

impl ByteSource for SliceSource<'_> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() > self.remaining() {
            return Err(StreamError::UnexpectedEof {
                offset: self.offset as u64,
            }
            .into());
        }
        buf.copy_from_slice(&self.buffer[self.offset..self.offset + buf.len()]);
        self.offset += buf.len();
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.buffer.get(self.offset).copied())
    }

    fn position(&self) -> u64 {
        self.offset as u64
    }

    fn copy_to(&mut self, sink: &mut dyn Write) -> Result<u64> {
        let rest = &self.buffer[self.offset.min(self.buffer.len())..];
        sink.write_all(rest)?;
        self.offset = self.buffer.len();
        Ok(rest.len() as u64)
    }
}

/// Adapter for any buffered reader (files, sockets, stdin).
pub struct IoSource<R> {
    inner: R,
    position: u64,
}

impl<R: BufRead> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<&[u8]> {
        loop {
            match self.inner.fill_buf() {
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.inner.fill_buf()
    }
}

impl<R: BufRead> ByteSource for IoSource<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.position;
        let mut filled = 0;
        while filled < buf.len() {
            let available = self.fill()?;
            if available.is_empty() {
                return Err(StreamError::UnexpectedEof { offset: start }.into());
            }
            let n = available.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&available[..n]);
            self.inner.consume(n);
            self.position += n as u64;
            filled += n;
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.fill()?.first().copied())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn copy_to(&mut self, sink: &mut dyn Write) -> Result<u64> {
        let n = io::copy(&mut self.inner, sink)?;
        self.position += n;
        Ok(n)
    }
}
