// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use chwire::types::{parse_type, ColumnList};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that parses must re-parse from its canonical form
    if let Ok(node) = parse_type(text) {
        let canonical = node.canonical();
        let again = parse_type(&canonical).expect("canonical form must parse");
        assert_eq!(again.canonical(), canonical);
    }

    for column in ColumnList::new(text) {
        let _ = column;
    }
});
