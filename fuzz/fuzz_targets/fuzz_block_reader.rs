// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use chwire::codec::ByteSource;
use chwire::transport::BlockReader;
use chwire::WireConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Keep declared sizes small so the fuzzer explores framing, not allocation
    let config = WireConfig::new().max_compressed_size(1 << 20);
    let mut reader = BlockReader::with_config(data, &config);
    let mut sink = Vec::new();
    let _ = reader.copy_to(&mut sink);
});
