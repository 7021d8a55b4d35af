// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Closed enumeration of column type kinds.

use std::fmt;

/// Every type kind the wire core understands.
///
/// `Nullable` and `LowCardinality` are not kinds: they are flags on
/// [`TypeNode`](super::TypeNode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Float32,
    Float64,
    Decimal,
    Decimal32,
    Decimal64,
    Decimal128,
    Decimal256,
    Date,
    Date32,
    DateTime,
    DateTime32,
    DateTime64,
    Enum8,
    Enum16,
    String,
    FixedString,
    Uuid,
    IPv4,
    IPv6,
    Point,
    Ring,
    Polygon,
    MultiPolygon,
    Array,
    Map,
    Tuple,
    Nested,
    AggregateFunction,
    SimpleAggregateFunction,
}

/// Canonical names followed by accepted aliases. Matching is case-insensitive.
const NAMES: &[(&str, DataKind)] = &[
    ("Bool", DataKind::Bool),
    ("Int8", DataKind::Int8),
    ("Int16", DataKind::Int16),
    ("Int32", DataKind::Int32),
    ("Int64", DataKind::Int64),
    ("Int128", DataKind::Int128),
    ("Int256", DataKind::Int256),
    ("UInt8", DataKind::UInt8),
    ("UInt16", DataKind::UInt16),
    ("UInt32", DataKind::UInt32),
    ("UInt64", DataKind::UInt64),
    ("UInt128", DataKind::UInt128),
    ("UInt256", DataKind::UInt256),
    ("Float32", DataKind::Float32),
    ("Float64", DataKind::Float64),
    ("Decimal", DataKind::Decimal),
    ("Decimal32", DataKind::Decimal32),
    ("Decimal64", DataKind::Decimal64),
    ("Decimal128", DataKind::Decimal128),
    ("Decimal256", DataKind::Decimal256),
    ("Date", DataKind::Date),
    ("Date32", DataKind::Date32),
    ("DateTime", DataKind::DateTime),
    ("DateTime32", DataKind::DateTime32),
    ("DateTime64", DataKind::DateTime64),
    ("Enum8", DataKind::Enum8),
    ("Enum16", DataKind::Enum16),
    ("String", DataKind::String),
    ("FixedString", DataKind::FixedString),
    ("UUID", DataKind::Uuid),
    ("IPv4", DataKind::IPv4),
    ("IPv6", DataKind::IPv6),
    ("Point", DataKind::Point),
    ("Ring", DataKind::Ring),
    ("Polygon", DataKind::Polygon),
    ("MultiPolygon", DataKind::MultiPolygon),
    ("Array", DataKind::Array),
    ("Map", DataKind::Map),
    ("Tuple", DataKind::Tuple),
    ("Nested", DataKind::Nested),
    ("AggregateFunction", DataKind::AggregateFunction),
    ("SimpleAggregateFunction", DataKind::SimpleAggregateFunction),
    // SQL-compatible aliases
    ("Boolean", DataKind::Bool),
    ("TinyInt", DataKind::Int8),
    ("SmallInt", DataKind::Int16),
    ("Int", DataKind::Int32),
    ("Integer", DataKind::Int32),
    ("BigInt", DataKind::Int64),
    ("Float", DataKind::Float32),
    ("Real", DataKind::Float32),
    ("Double", DataKind::Float64),
    ("Text", DataKind::String),
    ("VarChar", DataKind::String),
    ("Char", DataKind::String),
    ("Blob", DataKind::String),
    ("Binary", DataKind::FixedString),
    // snake_case spellings
    ("date_time", DataKind::DateTime),
    ("date_time32", DataKind::DateTime32),
    ("date_time64", DataKind::DateTime64),
    ("fixed_string", DataKind::FixedString),
    ("multi_polygon", DataKind::MultiPolygon),
    ("aggregate_function", DataKind::AggregateFunction),
    ("simple_aggregate_function", DataKind::SimpleAggregateFunction),
];

impl DataKind {
    /// Resolve a type name (case-insensitive, aliases included).
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, k)| *k)
    }

    /// Canonical spelling used when rendering declarations.
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, k)| *k == self)
            .map(|(n, _)| *n)
            .unwrap_or("?")
    }

    /// Kinds that may never carry the nullable flag.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Self::Array
                | Self::Map
                | Self::Tuple
                | Self::Nested
                | Self::Point
                | Self::Ring
                | Self::Polygon
                | Self::MultiPolygon
                | Self::AggregateFunction
        )
    }

    pub fn is_decimal(self) -> bool {
        matches!(
            self,
            Self::Decimal | Self::Decimal32 | Self::Decimal64 | Self::Decimal128 | Self::Decimal256
        )
    }

    pub fn is_enum(self) -> bool {
        matches!(self, Self::Enum8 | Self::Enum16)
    }

    /// Bit width and signedness of integer kinds.
    pub fn integer_layout(self) -> Option<(u32, bool)> {
        match self {
            Self::Int8 => Some((8, true)),
            Self::Int16 => Some((16, true)),
            Self::Int32 => Some((32, true)),
            Self::Int64 => Some((64, true)),
            Self::Int128 => Some((128, true)),
            Self::Int256 => Some((256, true)),
            Self::UInt8 => Some((8, false)),
            Self::UInt16 => Some((16, false)),
            Self::UInt32 => Some((32, false)),
            Self::UInt64 => Some((64, false)),
            Self::UInt128 => Some((128, false)),
            Self::UInt256 => Some((256, false)),
            _ => None,
        }
    }

    /// Largest precision accepted by the decimal kind, and the implied
    /// precision for the fixed-width spellings.
    pub fn decimal_max_precision(self) -> Option<u32> {
        match self {
            Self::Decimal32 => Some(9),
            Self::Decimal64 => Some(18),
            Self::Decimal128 => Some(38),
            Self::Decimal256 | Self::Decimal => Some(76),
            _ => None,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte width of a decimal with the given precision.
pub fn decimal_width(precision: u32) -> usize {
    match precision {
        0..=9 => 4,
        10..=18 => 8,
        19..=38 => 16,
        _ => 32,
    }
}
