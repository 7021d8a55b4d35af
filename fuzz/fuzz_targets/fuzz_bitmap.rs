// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use chwire::bitmap::{decode_bitmap, encode_bitmap, ElementType};
use chwire::codec::SliceSource;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let bits = [8, 16, 32, 64][(selector & 0x03) as usize];
    let Some(element) = ElementType::new(bits, selector & 0x04 != 0) else {
        return;
    };

    // A decoded bitmap must re-encode and decode to the same set
    if let Ok(bitmap) = decode_bitmap(element, &mut SliceSource::new(rest)) {
        let mut buf = Vec::new();
        encode_bitmap(&bitmap, &mut buf).expect("re-encode");
        let again = decode_bitmap(element, &mut SliceSource::new(&buf)).expect("re-decode");
        assert_eq!(again, bitmap);
    }
});
