// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use chwire::codec::{CodecOptions, SliceSource};
use chwire::RowReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let options = CodecOptions {
        max_string_length: 1 << 16,
        ..CodecOptions::default()
    };
    if let Ok(reader) = RowReader::with_header(SliceSource::new(data), options) {
        for row in reader.take(64) {
            if row.is_err() {
                break;
            }
        }
    }
});
