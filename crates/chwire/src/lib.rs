// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! chwire: RowBinary wire-format core
//!
//! Turns column type declarations into a type model and uses it to encode and
//! decode RowBinary rows, optionally carried inside checksummed compressed
//! blocks.
//!
//! - [`types`]: declaration parser and [`TypeNode`](types::TypeNode)
//! - [`codec`]: per-kind value codecs and the byte source abstraction
//! - [`row`]: whole-row reader/writer with optional names-and-types header
//! - [`transport`]: block framing (LZ4, zstd, none) with CityHash128 checksums
//! - [`bitmap`]: `groupBitmap` aggregate state
//!
//! # Quick Start
//!
//! ```rust
//! use chwire::codec::CodecOptions;
//! use chwire::row::{RowReader, RowWriter, Schema};
//! use chwire::transport::{BlockReader, BlockWriter};
//! use chwire::Value;
//!
//! let schema = Schema::parse("id UInt64, name String").unwrap();
//!
//! let mut writer = RowWriter::new(BlockWriter::new(Vec::new()), schema.clone(), CodecOptions::default());
//! writer.write_row(&[Value::UInt64(7), Value::from("seven")]).unwrap();
//! let stream = writer.into_inner().finish().unwrap();
//!
//! let reader = RowReader::new(BlockReader::new(stream.as_slice()), schema, CodecOptions::default());
//! let rows: Vec<Vec<Value>> = reader.collect::<chwire::Result<_>>().unwrap();
//! assert_eq!(rows[0][1].as_str(), Some("seven"));
//! ```

pub mod bitmap;
pub mod codec;
pub mod config;
pub mod error;
pub mod row;
pub mod transport;
pub mod types;
pub mod value;

pub use config::WireConfig;
pub use error::{CodecError, Error, ParseError, Result, StreamError};
pub use row::{RowReader, RowWriter, Schema};
pub use types::{parse_type, DataKind, TypeNode};
pub use value::Value;
