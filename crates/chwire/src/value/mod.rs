// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scalar and composite values carried by rows.
//!
//! [`Value`] is the single in-memory representation the codecs read from and
//! produce. Cross-kind conversions (widening, rescaling, instant to date) live
//! in [`convert`] as free functions.

pub mod convert;
mod decimal;
mod wide;

pub use decimal::{Decimal, DecimalParseError};
pub use wide::{WideParseError, I256, U256};

use crate::bitmap::Bitmap;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use uuid::Uuid;

/// A value of any supported column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),

    // Integers
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    Int256(I256),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    UInt256(U256),

    Float32(f32),
    Float64(f64),
    Decimal(Decimal),

    // Time
    Date(NaiveDate),
    DateTime(DateTime<Utc>),

    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Enum(i16, String), // (value, name)
    Point(f64, f64),

    // Composites
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>), // insertion order
    Tuple(Vec<Value>),
    Bitmap(Bitmap),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short variant name, used in type-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int8(_) => "Int8",
            Self::Int16(_) => "Int16",
            Self::Int32(_) => "Int32",
            Self::Int64(_) => "Int64",
            Self::Int128(_) => "Int128",
            Self::Int256(_) => "Int256",
            Self::UInt8(_) => "UInt8",
            Self::UInt16(_) => "UInt16",
            Self::UInt32(_) => "UInt32",
            Self::UInt64(_) => "UInt64",
            Self::UInt128(_) => "UInt128",
            Self::UInt256(_) => "UInt256",
            Self::Float32(_) => "Float32",
            Self::Float64(_) => "Float64",
            Self::Decimal(_) => "Decimal",
            Self::Date(_) => "Date",
            Self::DateTime(_) => "DateTime",
            Self::String(_) => "String",
            Self::Bytes(_) => "Bytes",
            Self::Uuid(_) => "UUID",
            Self::Ipv4(_) => "IPv4",
            Self::Ipv6(_) => "IPv6",
            Self::Enum(..) => "Enum",
            Self::Point(..) => "Point",
            Self::Array(_) => "Array",
            Self::Map(_) => "Map",
            Self::Tuple(_) => "Tuple",
            Self::Bitmap(_) => "Bitmap",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer value that fits in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        convert::to_i128(self).and_then(|v| i64::try_from(v).ok())
    }

    /// Any non-negative integer value that fits in `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        convert::to_i128(self).and_then(|v| u64::try_from(v).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float32(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            Self::Enum(_, name) => Some(name),
            _ => None,
        }
    }

    /// Raw bytes of `String` or `Bytes` values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(v) => Some(v.as_bytes()),
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Self::Decimal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Self::Tuple(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bitmap(&self) -> Option<&Bitmap> {
        match self {
            Self::Bitmap(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[Value], open: &str, close: &str) -> fmt::Result {
            f.write_str(open)?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            f.write_str(close)
        }

        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int8(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::Int128(v) => write!(f, "{}", v),
            Self::Int256(v) => write!(f, "{}", v),
            Self::UInt8(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::UInt128(v) => write!(f, "{}", v),
            Self::UInt256(v) => write!(f, "{}", v),
            Self::Float32(v) => write!(f, "{}", v),
            Self::Float64(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::Date(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::String(v) => write!(f, "'{}'", v.replace('\'', "\\'")),
            Self::Bytes(v) => {
                f.write_str("x'")?;
                for b in v {
                    write!(f, "{:02x}", b)?;
                }
                f.write_str("'")
            }
            Self::Uuid(v) => write!(f, "{}", v),
            Self::Ipv4(v) => write!(f, "{}", v),
            Self::Ipv6(v) => write!(f, "{}", v),
            Self::Enum(_, name) => write!(f, "'{}'", name),
            Self::Point(x, y) => write!(f, "({}, {})", x, y),
            Self::Array(items) => list(f, items, "[", "]"),
            Self::Tuple(items) => list(f, items, "(", ")"),
            Self::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Self::Bitmap(b) => write!(f, "bitmap[{}]", b.len()),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => Int128,
    I256 => Int256,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    u128 => UInt128,
    U256 => UInt256,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
    NaiveDate => Date,
    DateTime<Utc> => DateTime,
    String => String,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    Ipv4Addr => Ipv4,
    Ipv6Addr => Ipv6,
    Vec<Value> => Array,
    Bitmap => Bitmap,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}
