// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for the PV varint encoding/decoding.
//!
//! Every posting in the index is a chain of these varints. If decode
//! panics on malformed input, or a roundtrip loses the value or the
//! `is_di` flag, every PV read built on top is unreliable.

#![no_main]

use libfuzzer_sys::fuzz_target;

use archer::pv::varint::{decode_varint, encode_varint};

fuzz_target!(|data: &[u8]| {
    if let Ok((value, is_di, consumed)) = decode_varint(data, 0) {
        let mut reencoded = Vec::new();
        encode_varint(value, is_di, &mut reencoded);

        let (redecoded, reflag, reconsumed) =
            decode_varint(&reencoded, 0).expect("re-encoding of a valid value must decode");

        assert_eq!(value, redecoded, "roundtrip value mismatch");
        assert_eq!(is_di, reflag, "roundtrip is_di flag mismatch");
        assert_eq!(reconsumed, reencoded.len(), "re-encoded varint not fully consumed");
        assert!(consumed <= data.len());
    }
});
