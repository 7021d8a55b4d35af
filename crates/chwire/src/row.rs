// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Whole-row RowBinary reading and writing.
//!
//! # Header
//!
//! `RowBinaryWithNamesAndTypes` streams start with:
//!
//! ```text
//! varint column_count
//! column_count x (varint len | UTF-8 name)
//! column_count x (varint len | type declaration)
//! ```
//!
//! Rows follow with every column encoded back to back, in schema order.

use crate::codec::varint::write_varint;
use crate::codec::{decode_value, encode_value, ByteSource, CodecOptions};
use crate::error::{CodecError, Error, Result, StreamError};
use crate::types::{parse_type, ColumnList, TypeNode};
use crate::value::Value;
use std::io::Write;

/// Ordered column names and types of a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    names: Vec<String>,
    types: Vec<TypeNode>,
}

impl Schema {
    /// Names come from the nodes themselves; unnamed columns get an empty name.
    pub fn new(types: Vec<TypeNode>) -> Self {
        let names = types
            .iter()
            .map(|t| t.name().unwrap_or_default().to_string())
            .collect();
        Self { names, types }
    }

    pub fn with_names(names: Vec<String>, types: Vec<TypeNode>) -> Result<Self> {
        if names.len() != types.len() {
            return Err(CodecError::RowArity {
                expected: types.len(),
                actual: names.len(),
            }
            .into());
        }
        Ok(Self { names, types })
    }

    /// Schema from a column list such as `` id UInt64, `tags` Array(String) ``.
    pub fn parse(columns: &str) -> Result<Self> {
        let types = ColumnList::new(columns).collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(types))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn types(&self) -> &[TypeNode] {
        &self.types
    }

    pub fn column(&self, index: usize) -> Option<(&str, &TypeNode)> {
        Some((self.names.get(index)?.as_str(), self.types.get(index)?))
    }

    /// Write the names-and-types header.
    pub fn write_header<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        write_varint(w, self.types.len() as u64)?;
        for name in &self.names {
            write_varint(w, name.len() as u64)?;
            w.write_all(name.as_bytes())?;
        }
        for node in &self.types {
            let decl = node.canonical();
            write_varint(w, decl.len() as u64)?;
            w.write_all(decl.as_bytes())?;
        }
        Ok(())
    }

    /// Read a names-and-types header and parse every type.
    pub fn read_header<S: ByteSource + ?Sized>(src: &mut S, opts: &CodecOptions) -> Result<Self> {
        let count = src.read_varint()?;
        let count = usize::try_from(count).map_err(|_| CodecError::OutOfRange {
            type_name: "header column count".into(),
            value: count.to_string(),
        })?;
        let mut names = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            names.push(read_header_string(src, opts, "column name")?);
        }
        let mut types = Vec::with_capacity(names.len());
        for _ in 0..count {
            types.push(parse_type(&read_header_string(src, opts, "column type")?)?);
        }
        log::debug!("[chwire] header: {} columns", count);
        Ok(Self { names, types })
    }
}

fn read_header_string<S: ByteSource + ?Sized>(
    src: &mut S,
    opts: &CodecOptions,
    what: &str,
) -> Result<String> {
    let len = src.read_varint()?;
    if len > opts.max_string_length as u64 {
        return Err(CodecError::StringTooLong {
            length: len,
            limit: opts.max_string_length,
        }
        .into());
    }
    let bytes = src.read_vec(len as usize)?;
    String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8(what.to_string()).into())
}

/// Attach the row and column to a value error. Stream errors already carry
/// their own offsets and pass through unchanged.
fn at_column(e: Error, row: u64, column: usize, node: &TypeNode) -> Error {
    match e {
        Error::Codec(_) => Error::Column {
            row,
            column,
            type_name: node.canonical(),
            source: Box::new(e),
        },
        other => other,
    }
}

/// Decodes rows from a byte source until it ends at a row boundary.
///
/// The source is consumed sequentially and the reader keeps no state beyond
/// the row counter; after an error it yields nothing further.
pub struct RowReader<S> {
    source: S,
    schema: Schema,
    options: CodecOptions,
    rows_read: u64,
    failed: bool,
}

impl<S: ByteSource> RowReader<S> {
    pub fn new(source: S, schema: Schema, options: CodecOptions) -> Self {
        Self {
            source,
            schema,
            options,
            rows_read: 0,
            failed: false,
        }
    }

    /// Read the header first and take the schema from it.
    pub fn with_header(mut source: S, options: CodecOptions) -> Result<Self> {
        let schema = Schema::read_header(&mut source, &options)?;
        Ok(Self::new(source, schema, options))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Next row, or `None` when the stream ends exactly between rows.
    pub fn read_row(&mut self) -> Result<Option<Vec<Value>>> {
        if self.failed || self.schema.is_empty() || self.source.peek()?.is_none() {
            return Ok(None);
        }
        let mut row = Vec::with_capacity(self.schema.len());
        for (column, node) in self.schema.types.iter().enumerate() {
            match decode_value(node, &mut self.source, &self.options) {
                Ok(value) => row.push(value),
                Err(e) if e.is_eof() => {
                    self.failed = true;
                    return Err(StreamError::TruncatedRow {
                        row: self.rows_read,
                        column,
                        type_name: node.canonical(),
                    }
                    .into());
                }
                Err(e) => {
                    self.failed = true;
                    return Err(at_column(e, self.rows_read, column, node));
                }
            }
        }
        self.rows_read += 1;
        log::trace!(
            "[chwire] row {} decoded ({} bytes consumed)",
            self.rows_read,
            self.source.position()
        );
        Ok(Some(row))
    }
}

impl<S: ByteSource> Iterator for RowReader<S> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_row() {
            Ok(row) => row.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Encodes rows into a sink.
///
/// Each row is encoded into a scratch buffer first, so a value that fails to
/// encode leaves nothing of its row in the sink.
pub struct RowWriter<W> {
    sink: W,
    schema: Schema,
    options: CodecOptions,
    scratch: Vec<u8>,
    rows_written: u64,
}

impl<W: Write> RowWriter<W> {
    pub fn new(sink: W, schema: Schema, options: CodecOptions) -> Self {
        Self {
            sink,
            schema,
            options,
            scratch: Vec::new(),
            rows_written: 0,
        }
    }

    /// Write the names-and-types header before any row.
    pub fn with_header(mut sink: W, schema: Schema, options: CodecOptions) -> Result<Self> {
        schema.write_header(&mut sink)?;
        Ok(Self::new(sink, schema, options))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn write_row(&mut self, row: &[Value]) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(CodecError::RowArity {
                expected: self.schema.len(),
                actual: row.len(),
            }
            .into());
        }
        self.scratch.clear();
        for (column, (node, value)) in self.schema.types.iter().zip(row).enumerate() {
            encode_value(node, value, &mut self.scratch, &self.options)
                .map_err(|e| at_column(e, self.rows_written, column, node))?;
        }
        self.sink.write_all(&self.scratch)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(Error::from)
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
