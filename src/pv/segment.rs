// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Segment allocation and chaining for the PV blob file (spec.md §3, §4.3).
//!
//! A segment is `[capacity: i32 be][body: capacity bytes][next: i32 be]`.
//! `capacity` is fixed at allocation time (this is the "4-byte length
//! header"); `next` is `-1` until a successor segment exists, at which
//! point it is patched to that segment's absolute start offset. Growth is
//! geometric: each new segment a PV allocates is at least as large as the
//! previous one, doubled, and at least large enough to hold the entry that
//! triggered the allocation.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{ArcherError, Result};

pub const HEADER_SIZE: i64 = 4;
pub const TRAILER_SIZE: i64 = 4;
pub const NO_NEXT: i32 = -1;
pub const MIN_CAPACITY: u32 = 64;

/// Allocates a new segment at EOF with capacity >= `min_capacity`,
/// growing geometrically from `prev_capacity`. Writes the header and a
/// placeholder (`-1`) trailer, and reserves the body bytes on disk via
/// `set_len`. Returns `(offset, capacity)`.
pub fn allocate(file: &mut File, prev_capacity: u32, min_capacity: u32) -> Result<(i64, u32)> {
    let mut capacity = prev_capacity.max(MIN_CAPACITY);
    while capacity < min_capacity {
        capacity = capacity.saturating_mul(2);
    }

    let offset = file.seek(SeekFrom::End(0))?;
    file.write_all(&(capacity as i32).to_be_bytes())?;
    let total_len = offset as u64 + HEADER_SIZE as u64 + capacity as u64 + TRAILER_SIZE as u64;
    file.set_len(total_len)?;
    file.seek(SeekFrom::Start(offset as u64 + HEADER_SIZE as u64 + capacity as u64))?;
    file.write_all(&NO_NEXT.to_be_bytes())?;

    Ok((offset as i64, capacity))
}

/// Patches the trailer of the segment at `offset` (with `capacity`) to
/// point at `next_offset`. Called only after the successor segment's
/// header and body are fully written, preserving crash-safety.
pub fn patch_trailer(file: &mut File, offset: i64, capacity: u32, next_offset: i64) -> Result<()> {
    file.seek(SeekFrom::Start((offset + HEADER_SIZE + capacity as i64) as u64))?;
    file.write_all(&(next_offset as i32).to_be_bytes())?;
    Ok(())
}

pub fn read_capacity(file: &mut File, offset: i64) -> Result<u32> {
    file.seek(SeekFrom::Start(offset as u64))?;
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    let capacity = i32::from_be_bytes(buf);
    if capacity < 0 {
        return Err(ArcherError::invariant("negative segment capacity"));
    }
    Ok(capacity as u32)
}

pub fn read_trailer(file: &mut File, offset: i64, capacity: u32) -> Result<i32> {
    file.seek(SeekFrom::Start((offset + HEADER_SIZE + capacity as i64) as u64))?;
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

pub fn body_start(offset: i64) -> i64 {
    offset + HEADER_SIZE
}
