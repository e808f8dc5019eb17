// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for the query string parser (spec.md §4.7).
//!
//! This is the first thing a hostile client's `query`/`nquery` line
//! reaches on the server: it must never panic, regardless of what
//! garbage arrives over the socket.

#![no_main]

use libfuzzer_sys::fuzz_target;

use archer::query::parse;

fuzz_target!(|data: &str| {
    let _ = parse(data);
});
