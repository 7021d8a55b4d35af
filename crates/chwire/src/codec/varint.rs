// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ULEB128 length prefixes.
//!
//! Every length on the RowBinary wire (strings, arrays, maps, header counts,
//! bitmap payloads) is an unsigned LEB128 varint: 7 data bits per byte, bit 7
//! set while more bytes follow.
//!
//! ```
//! use chwire::codec::varint::{decode_varint, encode_varint};
//!
//! let mut buf = [0u8; 10];
//! let len = encode_varint(300, &mut buf);
//! assert_eq!(&buf[..len], &[0xAC, 0x02]);
//! assert_eq!(decode_varint(&buf[..len]), Some((300, 2)));
//! ```

use std::io::{self, Write};

/// Maximum bytes needed to encode a u64.
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION_BIT: u8 = 0x80;
const DATA_MASK: u8 = 0x7F;

/// Encode into `buf` (at least [`MAX_VARINT_LEN`] bytes), returning the length.
#[inline]
pub fn encode_varint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    loop {
        let byte = (value & u64::from(DATA_MASK)) as u8;
        value >>= 7;
        if value == 0 {
            buf[i] = byte;
            return i + 1;
        }
        buf[i] = byte | CONTINUATION_BIT;
        i += 1;
    }
}

#[inline]
#[must_use]
pub const fn varint_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode from the front of `buf`. `None` on truncation or overflow.
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in buf.iter().enumerate().take(MAX_VARINT_LEN) {
        let data = u64::from(byte & DATA_MASK);
        if i == MAX_VARINT_LEN - 1 && data > 1 {
            return None;
        }
        value |= data << (7 * i);
        if byte & CONTINUATION_BIT == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Write `value` as a varint.
pub fn write_varint<W: Write + ?Sized>(w: &mut W, value: u64) -> io::Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_varint(value, &mut buf);
    w.write_all(&buf[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        for (value, len) in [(0u64, 1), (127, 1), (128, 2), (16_383, 2), (16_384, 3), (u64::MAX, 10)] {
            let mut buf = [0u8; MAX_VARINT_LEN];
            assert_eq!(encode_varint(value, &mut buf), len, "{value}");
            assert_eq!(varint_len(value), len);
            assert_eq!(decode_varint(&buf[..len]), Some((value, len)));
        }
    }

    #[test]
    fn test_truncated_and_overlong() {
        assert_eq!(decode_varint(&[]), None);
        assert_eq!(decode_varint(&[0x80, 0x80]), None);
        let overlong = [0xFF; 11];
        assert_eq!(decode_varint(&overlong), None);
        let mut too_big = [0xFF; 10];
        too_big[9] = 0x02;
        assert_eq!(decode_varint(&too_big), None);
    }

    #[test]
    fn test_write_varint() {
        let mut out = Vec::new();
        write_varint(&mut out, 300).expect("write");
        assert_eq!(out, vec![0xAC, 0x02]);
    }
}
