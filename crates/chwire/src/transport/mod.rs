// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Checksummed compressed block stream.
//!
//! RowBinary bytes travel inside self-describing blocks:
//!
//! ```text
//! +------------------+--------+-----------------+-------------------+---------+
//! | checksum (16)    | method | compressed (4)  | uncompressed (4)  | payload |
//! | CityHash128 v102 | (1)    | incl. 9 header  |                   |         |
//! +------------------+--------+-----------------+-------------------+---------+
//! ```
//!
//! The checksum covers everything after itself (method byte, both sizes and
//! the payload). All integers are little-endian.
//!
//! [`BlockReader`] exposes the concatenated decompressed blocks as one byte
//! stream; [`BlockWriter`] produces them.

mod block;
pub mod cityhash;

pub use block::{encode_block, BlockHeader, BlockReader, BlockWriter, CompressionMethod};
