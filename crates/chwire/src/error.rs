// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types shared across the wire core.
//!
//! Three families, mirroring where a failure originates:
//!
//! - [`ParseError`]: a column type declaration is malformed.
//! - [`CodecError`]: a value cannot be represented by (or read as) its column type.
//! - [`StreamError`]: the byte stream itself is corrupt or truncated.
//!
//! None of them are retried inside this crate.

use std::io;
use thiserror::Error;

/// Malformed type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset} near `{fragment}`")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Byte offset into the declaration string.
    pub offset: usize,
    /// The offending substring (truncated to a readable length).
    pub fragment: String,
}

impl ParseError {
    const MAX_FRAGMENT: usize = 32;

    pub(crate) fn new(message: impl Into<String>, input: &str, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let mut end = (offset + Self::MAX_FRAGMENT).min(input.len());
        while !input.is_char_boundary(end) {
            end -= 1;
        }
        let mut start = offset;
        while !input.is_char_boundary(start) {
            start -= 1;
        }
        Self {
            message: message.into(),
            offset,
            fragment: input[start..end].to_string(),
        }
    }
}

/// A value does not fit its column type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("unsupported aggregate function: {0}")]
    UnsupportedAggregate(String),

    #[error("value {value} overflows {type_name}")]
    Overflow { type_name: String, value: String },

    #[error("value {value} out of range for {type_name}")]
    OutOfRange { type_name: String, value: String },

    #[error("invalid scale {scale} for {type_name}")]
    InvalidScale { type_name: String, scale: u32 },

    #[error("{type_name} expects {expected} bytes, got {actual}")]
    FixedLengthMismatch {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("cannot encode {found} as {type_name}")]
    TypeMismatch { type_name: String, found: String },

    #[error("NULL given for non-nullable {0}")]
    UnexpectedNull(String),

    #[error("unknown enum name '{name}' for {type_name}")]
    UnknownEnumName { type_name: String, name: String },

    #[error("unknown enum value {value} for {type_name}")]
    UnknownEnumValue { type_name: String, value: i64 },

    #[error("bitmap container count {0} does not fit in 32 bits")]
    BitmapCountOverflow(u64),

    #[error("invalid bitmap payload: {0}")]
    InvalidBitmap(String),

    #[error("nested column lengths differ: {0:?}")]
    NestedLengthMismatch(Vec<usize>),

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(String),

    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("string of {length} bytes exceeds limit {limit}")]
    StringTooLong { length: u64, limit: usize },

    #[error("row has {actual} values, schema has {expected} columns")]
    RowArity { expected: usize, actual: usize },
}

/// Corrupt or truncated stream. Always fatal for the stream it came from.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("checksum mismatch in block at offset {offset}")]
    ChecksumMismatch { offset: u64 },

    #[error("unknown compression method 0x{0:02x}")]
    UnknownMethod(u8),

    #[error("block declares {declared} bytes, limit is {limit}")]
    BlockTooLarge { declared: usize, limit: usize },

    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("decompression failed: {0}")]
    Decompress(String),

    /// `offset` is where the unsatisfied read started.
    #[error("unexpected end of stream at offset {offset}")]
    UnexpectedEof { offset: u64 },

    #[error("stream ended inside row {row} at column {column} ({type_name})")]
    TruncatedRow {
        row: u64,
        column: usize,
        type_name: String,
    },

    #[error("varint too long at offset {offset}")]
    VarintOverflow { offset: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Top-level error for every public operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("corrupt stream: {0}")]
    Stream(#[from] StreamError),

    /// A value error inside a row, with its position.
    #[error("row {row}, column {column} ({type_name}): {source}")]
    Column {
        row: u64,
        column: usize,
        type_name: String,
        #[source]
        source: Box<Error>,
    },
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Stream(StreamError::Io(e))
    }
}

impl Error {
    /// The error beneath any row/column context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Column { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the underlying stream ran out exactly where reading started.
    pub(crate) fn is_eof(&self) -> bool {
        matches!(self, Error::Stream(StreamError::UnexpectedEof { .. }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_fragment_points_at_offset() {
        let err = ParseError::new("expected ')'", "Array(UInt8", 11);
        assert_eq!(err.offset, 11);
        assert_eq!(err.fragment, "");

        let err = ParseError::new("unknown type", "Array(Foo)", 6);
        assert_eq!(err.fragment, "Foo)");
        assert_eq!(err.to_string(), "unknown type at offset 6 near `Foo)`");
    }

    #[test]
    fn test_error_display_variants() {
        let err: Error = CodecError::Overflow {
            type_name: "UInt8".into(),
            value: "256".into(),
        }
        .into();
        assert_eq!(err.to_string(), "codec error: value 256 overflows UInt8");

        let err: Error = StreamError::TruncatedRow {
            row: 3,
            column: 1,
            type_name: "String".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "corrupt stream: stream ended inside row 3 at column 1 (String)"
        );
    }

    #[test]
    fn test_io_error_maps_to_stream() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(err, Error::Stream(StreamError::Io(_))));
    }
}
