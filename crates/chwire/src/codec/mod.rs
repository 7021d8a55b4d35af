// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RowBinary value codecs.
//!
//! Every [`DataKind`] maps to one [`CodecEntry`] through an exhaustive `match`
//! in [`codec_for`], so adding a kind without a codec is a compile error.
//! Entries are plain function pointers: the table has no state and is safe to
//! use from any number of threads.
//!
//! Nullability is handled once in [`encode_value`] / [`decode_value`] before
//! dispatch: a marker byte (`1` = NULL, `0` = value follows) precedes the
//! value. `LowCardinality` does not change the RowBinary layout.
//!
//! # Example
//!
//! ```rust
//! use chwire::codec::{decode_value, encode_value, CodecOptions, SliceSource};
//! use chwire::types::parse_type;
//! use chwire::Value;
//!
//! let node = parse_type("Array(Nullable(UInt8))").unwrap();
//! let value = Value::Array(vec![Value::UInt8(7), Value::Null]);
//! let opts = CodecOptions::default();
//!
//! let mut buf = Vec::new();
//! encode_value(&node, &value, &mut buf, &opts).unwrap();
//! assert_eq!(buf, [2, 0, 7, 1]);
//!
//! let decoded = decode_value(&node, &mut SliceSource::new(&buf), &opts).unwrap();
//! assert_eq!(decoded, value);
//! ```

mod composite;
mod scalar;
pub mod source;
pub mod varint;

pub use source::{ByteSource, IoSource, SliceSource};

use crate::error::{CodecError, Result};
use crate::types::{DataKind, TypeNode};
use crate::value::Value;
use byteorder::WriteBytesExt;
use chrono_tz::Tz;
use std::io::Write;

const NULL_MARKER: u8 = 1;
const VALUE_MARKER: u8 = 0;

/// Per-stream settings consulted by the codecs.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Zone used to turn an instant into a calendar day for `Date`/`Date32`.
    pub default_timezone: Option<Tz>,
    /// Decoded `String` values longer than this are rejected.
    pub max_string_length: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            default_timezone: None,
            max_string_length: 1 << 30,
        }
    }
}

pub type SerializeFn = fn(&TypeNode, &Value, &mut dyn Write, &CodecOptions) -> Result<()>;
pub type DeserializeFn = fn(&TypeNode, &mut dyn ByteSource, &CodecOptions) -> Result<Value>;

/// Serialize/deserialize pair for one kind.
#[derive(Clone, Copy)]
pub struct CodecEntry {
    pub serialize: SerializeFn,
    pub deserialize: DeserializeFn,
}

macro_rules! entry {
    ($module:ident :: $enc:ident, $dec:ident) => {
        CodecEntry {
            serialize: $module::$enc,
            deserialize: $module::$dec,
        }
    };
}

/// Codec for `kind`. Never fails: every kind has an entry, and kinds whose
/// parameters are unsupported (e.g. an unknown aggregate function) report it
/// when called.
pub fn codec_for(kind: DataKind) -> CodecEntry {
    use DataKind::*;
    match kind {
        Bool => entry!(scalar::encode_bool, decode_bool),
        Int8 | Int16 | Int32 | Int64 | Int128 | Int256 | UInt8 | UInt16 | UInt32 | UInt64
        | UInt128 | UInt256 => entry!(scalar::encode_integer, decode_integer),
        Float32 | Float64 => entry!(scalar::encode_float, decode_float),
        Decimal | Decimal32 | Decimal64 | Decimal128 | Decimal256 => {
            entry!(scalar::encode_decimal, decode_decimal)
        }
        Date => entry!(scalar::encode_date, decode_date),
        Date32 => entry!(scalar::encode_date32, decode_date32),
        DateTime | DateTime32 => entry!(scalar::encode_datetime, decode_datetime),
        DateTime64 => entry!(scalar::encode_datetime64, decode_datetime64),
        Enum8 | Enum16 => entry!(scalar::encode_enum, decode_enum),
        String => entry!(scalar::encode_string, decode_string),
        FixedString => entry!(scalar::encode_fixed_string, decode_fixed_string),
        Uuid => entry!(scalar::encode_uuid, decode_uuid),
        IPv4 => entry!(scalar::encode_ipv4, decode_ipv4),
        IPv6 => entry!(scalar::encode_ipv6, decode_ipv6),
        Point | Ring | Polygon | MultiPolygon => entry!(composite::encode_geo, decode_geo),
        Array => entry!(composite::encode_array, decode_array),
        Map => entry!(composite::encode_map, decode_map),
        Tuple => entry!(composite::encode_tuple, decode_tuple),
        Nested => entry!(composite::encode_nested, decode_nested),
        AggregateFunction => entry!(composite::encode_aggregate, decode_aggregate),
        SimpleAggregateFunction => entry!(composite::encode_simple_aggregate, decode_simple_aggregate),
    }
}

/// Write `value` as column type `node`.
pub fn encode_value(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    if node.is_nullable() {
        if value.is_null() {
            w.write_u8(NULL_MARKER)?;
            return Ok(());
        }
        w.write_u8(VALUE_MARKER)?;
    } else if value.is_null() {
        return Err(CodecError::UnexpectedNull(node.to_string()).into());
    }
    (codec_for(node.kind()).serialize)(node, value, w, opts)
}

/// Read one value of column type `node`.
pub fn decode_value(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    opts: &CodecOptions,
) -> Result<Value> {
    if node.is_nullable() {
        match src.read_u8()? {
            NULL_MARKER => return Ok(Value::Null),
            VALUE_MARKER => {}
            other => {
                return Err(CodecError::OutOfRange {
                    type_name: format!("null marker of {}", node),
                    value: other.to_string(),
                }
                .into())
            }
        }
    }
    (codec_for(node.kind()).deserialize)(node, src, opts)
}

pub(crate) fn mismatch(node: &TypeNode, value: &Value) -> crate::error::Error {
    CodecError::TypeMismatch {
        type_name: node.to_string(),
        found: value.type_name().to_string(),
    }
    .into()
}
