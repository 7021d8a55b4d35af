// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bitmap aggregate state (`groupBitmap` and friends).
//!
//! # Wire layout
//!
//! ```text
//! small (cardinality <= 32):
//!   u8 0 | u8 count | count x value (element width, little-endian, ascending)
//!
//! large:
//!   u8 1 | varint byte_len | roaring portable serialization (byte_len bytes)
//! ```
//!
//! Elements of 8/16/32-bit types live in a 32-bit roaring bitmap; signed values
//! are sign-extended to 32 bits first, so `-1i8` is stored as `0xFFFF_FFFF`.
//! 64-bit types use a 64-bit roaring map whose leading bitmap count is a `u64`
//! in the `roaring` crate but a `u32` on the wire; [`reframe_to_external`] and
//! [`reframe_from_external`] are the only places that translate between the two.

use crate::codec::source::ByteSource;
use crate::codec::varint::write_varint;
use crate::error::{CodecError, Result};
use crate::types::TypeNode;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use roaring::{RoaringBitmap, RoaringTreemap};
use std::io::Write;

/// Largest cardinality written in the small form.
pub const SMALL_SET_CAPACITY: usize = 32;

const FORM_SMALL: u8 = 0;
const FORM_LARGE: u8 = 1;

/// Integer element type of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementType {
    bits: u32,
    signed: bool,
}

impl ElementType {
    pub fn new(bits: u32, signed: bool) -> Option<Self> {
        matches!(bits, 8 | 16 | 32 | 64).then_some(Self { bits, signed })
    }

    /// Element type of a `groupBitmap` argument column.
    pub fn from_node(node: &TypeNode) -> std::result::Result<Self, CodecError> {
        node.kind()
            .integer_layout()
            .and_then(|(bits, signed)| Self::new(bits, signed))
            .ok_or_else(|| CodecError::UnsupportedType(format!("bitmap of {}", node.kind())))
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Byte width of one element in the small form.
    pub fn width(&self) -> usize {
        (self.bits / 8) as usize
    }

    fn range(&self) -> (i128, i128) {
        if self.signed {
            (-(1i128 << (self.bits - 1)), (1i128 << (self.bits - 1)) - 1)
        } else {
            (0, (1i128 << self.bits) - 1)
        }
    }

    fn key_of(&self, v: i128) -> Option<u64> {
        let (min, max) = self.range();
        if v < min || v > max {
            return None;
        }
        Some(match (self.bits, self.signed) {
            (64, true) => v as i64 as u64,
            (64, false) => v as u64,
            (_, true) => v as i32 as u32 as u64,
            (_, false) => v as u64,
        })
    }

    fn value_of(&self, key: u64) -> i128 {
        match (self.bits, self.signed) {
            (64, true) => key as i64 as i128,
            (64, false) => key as i128,
            (_, true) => key as u32 as i32 as i128,
            (_, false) => key as i128,
        }
    }

    /// Keys produced by [`key_of`](Self::key_of) and nothing else.
    fn is_valid_key(&self, key: u64) -> bool {
        self.key_of(self.value_of(key)) == Some(key)
    }

    fn write_value(&self, v: i128, out: &mut Vec<u8>) {
        let bytes = (v as u64).to_le_bytes();
        out.extend_from_slice(&bytes[..self.width()]);
    }

    fn read_value(&self, bytes: &[u8]) -> i128 {
        let mut raw = [0u8; 8];
        raw[..bytes.len()].copy_from_slice(bytes);
        let unsigned = u64::from_le_bytes(raw);
        if self.signed {
            let shift = 64 - self.bits;
            (((unsigned << shift) as i64) >> shift) as i128
        } else {
            unsigned as i128
        }
    }
}

/// Set of integers of one element type.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    element: ElementType,
    keys: RoaringTreemap,
}

impl Bitmap {
    pub fn new(element: ElementType) -> Self {
        Self {
            element,
            keys: RoaringTreemap::new(),
        }
    }

    pub fn from_values(
        element: ElementType,
        values: impl IntoIterator<Item = i128>,
    ) -> std::result::Result<Self, CodecError> {
        let mut bitmap = Self::new(element);
        for v in values {
            bitmap.insert(v)?;
        }
        Ok(bitmap)
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    /// Add a value; `Ok(false)` when it was already present.
    pub fn insert(&mut self, value: i128) -> std::result::Result<bool, CodecError> {
        let key = self.element.key_of(value).ok_or_else(|| CodecError::OutOfRange {
            type_name: format!(
                "{}Int{} bitmap",
                if self.element.signed { "" } else { "U" },
                self.element.bits
            ),
            value: value.to_string(),
        })?;
        Ok(self.keys.insert(key))
    }

    pub fn contains(&self, value: i128) -> bool {
        self.element
            .key_of(value)
            .is_some_and(|key| self.keys.contains(key))
    }

    pub fn len(&self) -> u64 {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Values in ascending numeric order.
    pub fn values(&self) -> Vec<i128> {
        let mut out: Vec<i128> = self.keys.iter().map(|k| self.element.value_of(k)).collect();
        if self.element.signed {
            out.sort_unstable();
        }
        out
    }
}

/// Serialize `bitmap` in the small or large form, by cardinality.
pub fn encode_bitmap<W: Write + ?Sized>(bitmap: &Bitmap, w: &mut W) -> Result<()> {
    let element = bitmap.element;
    if bitmap.len() <= SMALL_SET_CAPACITY as u64 {
        let mut out = Vec::with_capacity(2 + SMALL_SET_CAPACITY * element.width());
        out.push(FORM_SMALL);
        out.push(bitmap.len() as u8);
        for v in bitmap.values() {
            element.write_value(v, &mut out);
        }
        w.write_all(&out)?;
        return Ok(());
    }

    let payload = if element.bits <= 32 {
        let mut narrow = RoaringBitmap::new();
        for key in bitmap.keys.iter() {
            narrow.insert(key as u32);
        }
        let mut buf = Vec::with_capacity(narrow.serialized_size());
        narrow.serialize_into(&mut buf)?;
        buf
    } else {
        let mut buf = Vec::with_capacity(bitmap.keys.serialized_size());
        bitmap.keys.serialize_into(&mut buf)?;
        reframe_to_external(&buf)?
    };
    w.write_u8(FORM_LARGE)?;
    write_varint(w, payload.len() as u64)?;
    w.write_all(&payload)?;
    Ok(())
}

/// Read one bitmap of the given element type.
pub fn decode_bitmap<S: ByteSource + ?Sized>(element: ElementType, src: &mut S) -> Result<Bitmap> {
    let mut bitmap = Bitmap::new(element);
    match src.read_u8()? {
        FORM_SMALL => {
            let count = src.read_u8()? as usize;
            if count > SMALL_SET_CAPACITY {
                return Err(CodecError::InvalidBitmap(format!(
                    "small form holds {} values, limit is {}",
                    count, SMALL_SET_CAPACITY
                ))
                .into());
            }
            let bytes = src.read_vec(count * element.width())?;
            let mut previous: Option<i128> = None;
            for chunk in bytes.chunks_exact(element.width()) {
                let value = element.read_value(chunk);
                if previous.is_some_and(|p| value <= p) {
                    return Err(CodecError::InvalidBitmap(format!(
                        "small form value {} is not above its predecessor",
                        value
                    ))
                    .into());
                }
                previous = Some(value);
                bitmap.insert(value)?;
            }
        }
        FORM_LARGE => {
            let len = usize::try_from(src.read_varint()?)
                .map_err(|_| CodecError::InvalidBitmap("payload length overflows usize".into()))?;
            let payload = src.read_vec(len)?;
            let invalid = |e: std::io::Error| CodecError::InvalidBitmap(e.to_string());
            let keys: Vec<u64> = if element.bits <= 32 {
                let narrow = RoaringBitmap::deserialize_from(payload.as_slice()).map_err(invalid)?;
                narrow.iter().map(u64::from).collect()
            } else {
                let framed = reframe_from_external(&payload)?;
                let wide = RoaringTreemap::deserialize_from(framed.as_slice()).map_err(invalid)?;
                wide.iter().collect()
            };
            for key in keys {
                if !element.is_valid_key(key) {
                    return Err(CodecError::InvalidBitmap(format!(
                        "key {:#x} outside {}-bit element range",
                        key, element.bits
                    ))
                    .into());
                }
                bitmap.keys.insert(key);
            }
        }
        other => {
            return Err(CodecError::InvalidBitmap(format!("unknown form flag {}", other)).into());
        }
    }
    Ok(bitmap)
}

/// Rewrite a `RoaringTreemap::serialize_into` buffer (leading `u64` bitmap
/// count) into the wire layout (leading `u32` count). The per-bitmap records
/// that follow are identical in both layouts and are copied unchanged.
///
/// Fails with [`CodecError::BitmapCountOverflow`] when the count needs more
/// than 32 bits.
pub fn reframe_to_external(treemap: &[u8]) -> std::result::Result<Vec<u8>, CodecError> {
    let mut head = treemap;
    let count = head
        .read_u64::<LittleEndian>()
        .map_err(|_| CodecError::InvalidBitmap("missing 64-bit bitmap count".into()))?;
    let narrow = u32::try_from(count).map_err(|_| CodecError::BitmapCountOverflow(count))?;
    let mut out = Vec::with_capacity(treemap.len() - 4);
    out.write_u32::<LittleEndian>(narrow)
        .map_err(|e| CodecError::InvalidBitmap(e.to_string()))?;
    out.extend_from_slice(head);
    Ok(out)
}

/// Inverse of [`reframe_to_external`].
pub fn reframe_from_external(external: &[u8]) -> std::result::Result<Vec<u8>, CodecError> {
    let mut head = external;
    let count = head
        .read_u32::<LittleEndian>()
        .map_err(|_| CodecError::InvalidBitmap("missing 32-bit bitmap count".into()))?;
    let mut out = Vec::with_capacity(external.len() + 4);
    out.write_u64::<LittleEndian>(u64::from(count))
        .map_err(|e| CodecError::InvalidBitmap(e.to_string()))?;
    out.extend_from_slice(head);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::source::SliceSource;
    use crate::codec::varint::decode_varint;
    use crate::error::Error;

    fn u32_element() -> ElementType {
        ElementType::new(32, false).expect("element")
    }

    fn encode(bitmap: &Bitmap) -> Vec<u8> {
        let mut out = Vec::new();
        encode_bitmap(bitmap, &mut out).expect("encode");
        out
    }

    fn decode(element: ElementType, bytes: &[u8]) -> Bitmap {
        let mut src = SliceSource::new(bytes);
        let bitmap = decode_bitmap(element, &mut src).expect("decode");
        assert!(src.is_eof());
        bitmap
    }

    #[test]
    fn test_32_values_use_small_form() {
        let bitmap = Bitmap::from_values(u32_element(), (0..32).map(|v| v * 1000)).expect("values");
        let bytes = encode(&bitmap);
        assert_eq!(bytes[0], FORM_SMALL);
        assert_eq!(bytes[1], 32);
        assert_eq!(bytes.len(), 2 + 32 * 4);
        assert_eq!(&bytes[6..10], &1000u32.to_le_bytes());
        assert_eq!(decode(u32_element(), &bytes), bitmap);
    }

    #[test]
    fn test_33_values_use_large_form() {
        let bitmap = Bitmap::from_values(u32_element(), (0..33).map(|v| v * 1000)).expect("values");
        let bytes = encode(&bitmap);
        assert_eq!(bytes[0], FORM_LARGE);
        let mut expected = RoaringBitmap::new();
        expected.extend((0..33u32).map(|v| v * 1000));
        let mut roaring_bytes = Vec::new();
        expected.serialize_into(&mut roaring_bytes).expect("serialize");
        assert_eq!(&bytes[bytes.len() - roaring_bytes.len()..], roaring_bytes.as_slice());
        assert_eq!(decode(u32_element(), &bytes), bitmap);
    }

    #[test]
    fn test_signed_small_form_sorted_numerically() {
        let element = ElementType::new(16, true).expect("element");
        let bitmap = Bitmap::from_values(element, [5, -3, 0]).expect("values");
        let bytes = encode(&bitmap);
        assert_eq!(&bytes[2..], &[0xFD, 0xFF, 0x00, 0x00, 0x05, 0x00]);
        assert_eq!(decode(element, &bytes).values(), vec![-3, 0, 5]);
    }

    #[test]
    fn test_signed_values_sign_extend_in_large_form() {
        let element = ElementType::new(8, true).expect("element");
        let bitmap = Bitmap::from_values(element, -64..0).expect("values");
        let decoded = decode(element, &encode(&bitmap));
        assert!(decoded.contains(-1));
        assert!(decoded.contains(-64));
        assert!(bitmap.keys.contains(0xFFFF_FFFF));
    }

    #[test]
    fn test_out_of_range_insert() {
        let element = ElementType::new(8, false).expect("element");
        let mut bitmap = Bitmap::new(element);
        assert!(bitmap.insert(255).expect("insert"));
        assert!(!bitmap.insert(255).expect("insert"));
        assert!(matches!(bitmap.insert(256), Err(CodecError::OutOfRange { .. })));
        assert!(bitmap.insert(-1).is_err());
    }

    #[test]
    fn test_u64_large_form_round_trip() {
        let element = ElementType::new(64, false).expect("element");
        let values: Vec<i128> = (0..40).map(|i| (i as i128) << 33).collect();
        let bitmap = Bitmap::from_values(element, values).expect("values");
        let bytes = encode(&bitmap);
        assert_eq!(bytes[0], FORM_LARGE);
        let (len, n) = decode_varint(&bytes[1..]).expect("length");
        let payload = &bytes[1 + n..];
        assert_eq!(payload.len() as u64, len);
        assert_eq!(&payload[..4], &40u32.to_le_bytes());
        assert_eq!(decode(element, &bytes), bitmap);
    }

    #[test]
    fn test_reframe_round_trip_random_treemaps() {
        let mut rng = fastrand::Rng::with_seed(0x5EED);
        for _ in 0..50 {
            let mut treemap = RoaringTreemap::new();
            let groups = rng.usize(1..20);
            for _ in 0..groups {
                let high = rng.u64(0..1 << 20) << 32;
                for _ in 0..rng.usize(1..50) {
                    treemap.insert(high | rng.u64(0..1 << 32));
                }
            }
            let mut native = Vec::new();
            treemap.serialize_into(&mut native).expect("serialize");
            let external = reframe_to_external(&native).expect("reframe");
            assert_eq!(external.len(), native.len() - 4);
            let count = u32::from_le_bytes([external[0], external[1], external[2], external[3]]);
            let highs: std::collections::BTreeSet<u64> = treemap.iter().map(|v| v >> 32).collect();
            assert_eq!(count as usize, highs.len());
            assert_eq!(reframe_from_external(&external).expect("back"), native);
        }
    }

    #[test]
    fn test_reframe_count_overflow() {
        let mut native = Vec::new();
        native.extend_from_slice(&(u32::MAX as u64 + 1).to_le_bytes());
        assert_eq!(
            reframe_to_external(&native),
            Err(CodecError::BitmapCountOverflow(u32::MAX as u64 + 1))
        );
        assert!(reframe_to_external(&[1, 2, 3]).is_err());
        assert!(reframe_from_external(&[1]).is_err());
    }

    #[test]
    fn test_corrupt_payloads_rejected() {
        let element = u32_element();
        assert!(decode_bitmap(element, &mut SliceSource::new(&[7])).is_err());
        assert!(decode_bitmap(element, &mut SliceSource::new(&[0, 33])).is_err());
        assert!(decode_bitmap(element, &mut SliceSource::new(&[1, 3, 0xFF, 0xFF, 0xFF])).is_err());
        assert!(decode_bitmap(element, &mut SliceSource::new(&[0, 2, 1, 0, 0, 0]))
            .unwrap_err()
            .is_eof());
    }

    #[test]
    fn test_small_form_must_be_strictly_ascending() {
        let element = u32_element();
        for bytes in [
            [0u8, 2, 3, 0, 0, 0, 1, 0, 0, 0],
            [0u8, 2, 1, 0, 0, 0, 1, 0, 0, 0],
        ] {
            let err = decode_bitmap(element, &mut SliceSource::new(&bytes)).unwrap_err();
            assert!(matches!(err, Error::Codec(CodecError::InvalidBitmap(_))), "{err}");
        }

        let signed = ElementType::new(8, true).expect("element");
        assert_eq!(decode(signed, &[0, 2, 0xFF, 0x01]).values(), vec![-1, 1]);
        assert!(decode_bitmap(signed, &mut SliceSource::new(&[0, 2, 0x01, 0xFF])).is_err());
    }
}
