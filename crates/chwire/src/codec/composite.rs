// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Container, geo and aggregate-state codecs.

use super::source::{read_array, ByteSource};
use super::varint::write_varint;
use super::{decode_value, encode_value, mismatch, CodecOptions};
use crate::bitmap::{decode_bitmap, encode_bitmap, Bitmap, ElementType};
use crate::error::{CodecError, Result};
use crate::types::{DataKind, TypeNode};
use crate::value::{convert, Value};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// Initial capacity cap for length-prefixed containers; a corrupt count must
/// not reserve memory the stream cannot back.
const MAX_PREALLOC: usize = 4096;

/// Aggregate functions whose state is a bitmap.
const BITMAP_FUNCTIONS: &[&str] = &[
    "groupBitmap",
    "groupBitmapAnd",
    "groupBitmapOr",
    "groupBitmapXor",
    "group_bitmap",
    "group_bitmap_and",
    "group_bitmap_or",
    "group_bitmap_xor",
];

fn read_len(src: &mut dyn ByteSource) -> Result<usize> {
    let len = src.read_varint()?;
    usize::try_from(len).map_err(|_| {
        CodecError::OutOfRange {
            type_name: "container length".into(),
            value: len.to_string(),
        }
        .into()
    })
}

fn child(node: &TypeNode, index: usize) -> Result<&TypeNode> {
    node.children()
        .get(index)
        .ok_or_else(|| CodecError::UnsupportedType(node.to_string()).into())
}

// ---------------------------------------------------------------------------
// Geo
// ---------------------------------------------------------------------------

/// Nesting depth below Point: Ring = 1, Polygon = 2, MultiPolygon = 3.
fn geo_depth(kind: DataKind) -> usize {
    match kind {
        DataKind::Ring => 1,
        DataKind::Polygon => 2,
        DataKind::MultiPolygon => 3,
        _ => 0,
    }
}

fn write_geo(node: &TypeNode, value: &Value, depth: usize, w: &mut dyn Write) -> Result<()> {
    if depth == 0 {
        let (x, y) = match value {
            Value::Point(x, y) => (*x, *y),
            Value::Tuple(items) if items.len() == 2 => {
                match (convert::to_f64(&items[0]), convert::to_f64(&items[1])) {
                    (Some(x), Some(y)) => (x, y),
                    _ => return Err(mismatch(node, value)),
                }
            }
            other => return Err(mismatch(node, other)),
        };
        w.write_u64::<LittleEndian>(x.to_bits())?;
        w.write_u64::<LittleEndian>(y.to_bits())?;
        return Ok(());
    }
    let items = value.as_array().ok_or_else(|| mismatch(node, value))?;
    write_varint(w, items.len() as u64)?;
    for item in items {
        write_geo(node, item, depth - 1, w)?;
    }
    Ok(())
}

fn read_geo(src: &mut dyn ByteSource, depth: usize) -> Result<Value> {
    if depth == 0 {
        let x = f64::from_bits(u64::from_le_bytes(read_array(src)?));
        let y = f64::from_bits(u64::from_le_bytes(read_array(src)?));
        return Ok(Value::Point(x, y));
    }
    let len = read_len(src)?;
    let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        items.push(read_geo(src, depth - 1)?);
    }
    Ok(Value::Array(items))
}

pub(super) fn encode_geo(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    write_geo(node, value, geo_depth(node.kind()), w)
}

pub(super) fn decode_geo(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    read_geo(src, geo_depth(node.kind()))
}

// ---------------------------------------------------------------------------
// Array, Map, Tuple
// ---------------------------------------------------------------------------

pub(super) fn encode_array(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    let element = child(node, 0)?;
    let items = value.as_array().ok_or_else(|| mismatch(node, value))?;
    write_varint(w, items.len() as u64)?;
    for item in items {
        encode_value(element, item, w, opts)?;
    }
    Ok(())
}

pub(super) fn decode_array(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    opts: &CodecOptions,
) -> Result<Value> {
    let element = child(node, 0)?;
    let len = read_len(src)?;
    let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        items.push(decode_value(element, src, opts)?);
    }
    Ok(Value::Array(items))
}

pub(super) fn encode_map(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    let (key, val) = (child(node, 0)?, child(node, 1)?);
    let pairs = value.as_map().ok_or_else(|| mismatch(node, value))?;
    write_varint(w, pairs.len() as u64)?;
    for (k, v) in pairs {
        encode_value(key, k, w, opts)?;
        encode_value(val, v, w, opts)?;
    }
    Ok(())
}

pub(super) fn decode_map(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    opts: &CodecOptions,
) -> Result<Value> {
    let (key, val) = (child(node, 0)?, child(node, 1)?);
    let len = read_len(src)?;
    let mut pairs = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        let k = decode_value(key, src, opts)?;
        let v = decode_value(val, src, opts)?;
        pairs.push((k, v));
    }
    Ok(Value::Map(pairs))
}

pub(super) fn encode_tuple(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    let items = value
        .as_tuple()
        .filter(|items| items.len() == node.children().len())
        .ok_or_else(|| mismatch(node, value))?;
    for (element, item) in node.children().iter().zip(items) {
        encode_value(element, item, w, opts)?;
    }
    Ok(())
}

pub(super) fn decode_tuple(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    opts: &CodecOptions,
) -> Result<Value> {
    let items = node
        .children()
        .iter()
        .map(|element| decode_value(element, src, opts))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Tuple(items))
}

// ---------------------------------------------------------------------------
// Nested
// ---------------------------------------------------------------------------

/// Rows (`Array` of `Tuple`) are written column by column: every child is an
/// `Array` of that child's values with its own length prefix.
pub(super) fn encode_nested(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    let width = node.children().len();
    let rows = value.as_array().ok_or_else(|| mismatch(node, value))?;
    let rows = rows
        .iter()
        .map(|row| row.as_tuple().filter(|r| r.len() == width))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| mismatch(node, value))?;
    for (column, element) in node.children().iter().enumerate() {
        write_varint(w, rows.len() as u64)?;
        for row in &rows {
            encode_value(element, &row[column], w, opts)?;
        }
    }
    Ok(())
}

pub(super) fn decode_nested(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    opts: &CodecOptions,
) -> Result<Value> {
    let mut columns = Vec::with_capacity(node.children().len());
    for element in node.children() {
        let len = read_len(src)?;
        let mut values = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            values.push(decode_value(element, src, opts)?);
        }
        columns.push(values);
    }
    let lengths: Vec<usize> = columns.iter().map(Vec::len).collect();
    let rows = lengths.first().copied().unwrap_or(0);
    if lengths.iter().any(|&l| l != rows) {
        return Err(CodecError::NestedLengthMismatch(lengths).into());
    }
    let mut iters: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        let row = iters.iter_mut().filter_map(Iterator::next).collect();
        out.push(Value::Tuple(row));
    }
    Ok(Value::Array(out))
}

// ---------------------------------------------------------------------------
// Aggregate states
// ---------------------------------------------------------------------------

fn bitmap_element(node: &TypeNode) -> Result<ElementType> {
    let spec = node
        .aggregate()
        .ok_or_else(|| CodecError::UnsupportedType(node.to_string()))?;
    if !BITMAP_FUNCTIONS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(&spec.function))
    {
        return Err(CodecError::UnsupportedAggregate(spec.signature()).into());
    }
    Ok(ElementType::from_node(child(node, 0)?)?)
}

pub(super) fn encode_aggregate(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let element = bitmap_element(node)?;
    match value {
        Value::Bitmap(bitmap) if bitmap.element() == element => encode_bitmap(bitmap, w),
        Value::Array(items) => {
            let mut bitmap = Bitmap::new(element);
            for item in items {
                let v = convert::to_i128(item).ok_or_else(|| mismatch(node, item))?;
                bitmap.insert(v)?;
            }
            encode_bitmap(&bitmap, w)
        }
        other => Err(mismatch(node, other)),
    }
}

pub(super) fn decode_aggregate(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    let element = bitmap_element(node)?;
    Ok(Value::Bitmap(decode_bitmap(element, src)?))
}

/// `SimpleAggregateFunction(f, T)` stores a plain `T`.
pub(super) fn encode_simple_aggregate(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    encode_value(child(node, 0)?, value, w, opts)
}

pub(super) fn decode_simple_aggregate(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    opts: &CodecOptions,
) -> Result<Value> {
    decode_value(child(node, 0)?, src, opts)
}
