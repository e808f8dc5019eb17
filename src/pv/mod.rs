// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The position-vector (PV) store: a segmented, delta-encoded, append-only
//! byte stream per term or field id (spec.md §3, §4.3).
//!
//! A [`Pv`] is a small cursor-bearing header; the actual bytes live in a
//! shared blob [`File`] that many PVs (one per term) interleave into via
//! independently chained segments (see [`segment`]).
//!
//! Segment-boundary decision: both the writer and any reader apply the
//! same **fixed worst-case reservation** check (`bytes_remaining <
//! RESERVATION`) rather than the reader scanning for an end-of-segment
//! marker — see DESIGN.md for why this resolves the ambiguity between "a
//! zero byte is a valid zero-valued, non-`is_di` varint" and "a zero byte
//! is the end-of-segment marker".

pub mod segment;
pub mod varint;

use std::fs::File;
use std::io::{self, Read, Seek, Write};

use crate::error::{ArcherError, Result};

/// A single decoded posting for one term/field PV: a document id, the set
/// of field ids attached to this position (empty for a field PV, since
/// field PVs do not themselves carry nested field sets), and the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub di: i32,
    pub fields: Vec<i32>,
    pub pi: i32,
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    segment_offset: i64,
    segment_capacity: u32,
    bytes_used: u32,
    last_di: i32,
    last_pi: i32,
}

impl Cursor {
    fn fresh(segment_offset: i64, segment_capacity: u32) -> Self {
        Self {
            segment_offset,
            segment_capacity,
            bytes_used: 0,
            last_di: -1,
            last_pi: -1,
        }
    }

    fn remaining(&self) -> u32 {
        self.segment_capacity - self.bytes_used
    }
}

/// In-memory PV header: total count plus independent read/write cursor
/// state. Persisted verbatim by [`Pv::write`]/[`Pv::read`] so a process
/// can reopen an index mid-stream without rescanning the blob file.
#[derive(Debug, Clone)]
pub struct Pv {
    pub count: u64,
    start_offset: i64,
    write: Cursor,
    read: Cursor,
    read_count: u64,
    /// Snapshot taken before the most recent `read_next`, consumed by a
    /// single `unread`. `None` means there is nothing to unread.
    unread_snapshot: Option<(Cursor, u64)>,
    reservation: usize,
}

// count(8) + start_offset(8) + write{segment_offset(8), capacity(4),
// bytes_used(4), last_di(4), last_pi(4)} + read{segment_offset(8),
// capacity(4), bytes_used(4)} + read_count(8) = 64 bytes.
const HEADER_RECORD_SIZE: usize = 8 + 8 + 8 + 4 + 4 + 4 + 4 + 8 + 4 + 4 + 8;

impl Pv {
    /// Reserves the first segment for a brand-new PV (spec.md §4.3 `init`).
    pub fn init(file: &mut File, max_fields_per_position: usize) -> Result<Self> {
        let reservation = varint::max_encoded_size(max_fields_per_position);
        let (offset, capacity) = segment::allocate(file, 0, reservation as u32)?;
        let cursor = Cursor::fresh(offset, capacity);
        Ok(Self {
            count: 0,
            start_offset: offset,
            write: cursor,
            read: cursor,
            read_count: 0,
            unread_snapshot: None,
            reservation,
        })
    }

    /// Appends one posting. Fails with `InvariantViolation` if it would
    /// violate the monotone-(di, pi) ordering invariant.
    pub fn append(&mut self, file: &mut File, di: i32, fields: &[i32], pi: i32) -> Result<()> {
        if di < self.write.last_di || (di == self.write.last_di && pi <= self.write.last_pi) {
            return Err(ArcherError::invariant(format!(
                "pv append out of order: last=({}, {}), new=({}, {})",
                self.write.last_di, self.write.last_pi, di, pi
            )));
        }

        if (self.write.remaining() as usize) < self.reservation {
            // Emit the end-of-segment marker (if there's room for it) and
            // chain a new segment.
            if self.write.remaining() > 0 {
                file.seek(io::SeekFrom::Start(
                    (segment::body_start(self.write.segment_offset) + self.write.bytes_used as i64)
                        as u64,
                ))?;
                file.write_all(&[0u8])?;
            }
            let (new_offset, new_capacity) =
                segment::allocate(file, self.write.segment_capacity, self.reservation as u32)?;
            segment::patch_trailer(file, self.write.segment_offset, self.write.segment_capacity, new_offset)?;
            self.write.segment_offset = new_offset;
            self.write.segment_capacity = new_capacity;
            self.write.bytes_used = 0;
        }

        let di_changed = di != self.write.last_di;
        let mut buf = Vec::with_capacity(self.reservation);
        let delta_di = if di_changed { (di - self.write.last_di) as u64 } else { 0 };
        varint::encode_varint(delta_di, true, &mut buf);
        for &li in fields {
            varint::encode_varint(li as u64, true, &mut buf);
        }
        let pi_field = if di_changed {
            (pi as i64 + 1) as u64
        } else {
            (pi - self.write.last_pi) as u64
        };
        varint::encode_varint(pi_field, false, &mut buf);

        if buf.len() as u32 > self.write.remaining() {
            return Err(ArcherError::invariant(format!(
                "encoded posting ({} bytes, {} fields) exceeds the segment's remaining space ({} bytes); \
                 raise max_fields_per_position or shorten the field set for this position",
                buf.len(),
                fields.len(),
                self.write.remaining()
            )));
        }

        file.seek(io::SeekFrom::Start(
            (segment::body_start(self.write.segment_offset) + self.write.bytes_used as i64) as u64,
        ))?;
        file.write_all(&buf)?;

        self.write.bytes_used += buf.len() as u32;
        self.write.last_di = di;
        self.write.last_pi = pi;
        self.count += 1;
        Ok(())
    }

    /// Reads the next posting, following the segment chain as needed.
    /// Returns `None` once `read_count == count`.
    pub fn read_next(&mut self, file: &mut File) -> Result<Option<Posting>> {
        if self.read_count >= self.count {
            return Ok(None);
        }

        if (self.read.remaining() as usize) < self.reservation {
            let next = segment::read_trailer(file, self.read.segment_offset, self.read.segment_capacity)?;
            if next == segment::NO_NEXT {
                return Err(ArcherError::invariant(
                    "pv read ran off the end of the segment chain before reaching count",
                ));
            }
            let capacity = segment::read_capacity(file, next as i64)?;
            self.read = Cursor {
                segment_offset: next as i64,
                segment_capacity: capacity,
                bytes_used: 0,
                last_di: self.read.last_di,
                last_pi: self.read.last_pi,
            };
        }

        self.unread_snapshot = Some((self.read, self.read_count));

        let read_pos = segment::body_start(self.read.segment_offset) + self.read.bytes_used as i64;
        // Read a generously-sized window; a posting never exceeds the
        // reservation in encoded size.
        let window = self.reservation.min(self.read.remaining() as usize);
        let mut raw = vec![0u8; window];
        file.seek(io::SeekFrom::Start(read_pos as u64))?;
        let n = file.read(&mut raw)?;
        raw.truncate(n);

        let mut pos = 0usize;
        let (delta_di, is_di, c) = varint::decode_varint(&raw, pos)?;
        if !is_di {
            return Err(ArcherError::invariant("expected is_di varint for doc delta"));
        }
        pos += c;
        let di_changed = delta_di != 0 || self.read.last_di < 0;
        let di = if di_changed {
            self.read.last_di + delta_di as i32
        } else {
            self.read.last_di
        };

        let mut fields = Vec::new();
        loop {
            let (value, is_di, c) = varint::decode_varint(&raw, pos)?;
            pos += c;
            if is_di {
                fields.push(value as i32);
            } else {
                let pi = if di_changed {
                    value as i32 - 1
                } else {
                    self.read.last_pi + value as i32
                };
                self.read.bytes_used += pos as u32;
                self.read.last_di = di;
                self.read.last_pi = pi;
                self.read_count += 1;
                return Ok(Some(Posting { di, fields, pi }));
            }
        }
    }

    /// Undoes the single most recent `read_next`. Calling this twice in a
    /// row without an intervening `read_next` is a programmer error.
    pub fn unread(&mut self) -> Result<()> {
        match self.unread_snapshot.take() {
            Some((cursor, count)) => {
                self.read = cursor;
                self.read_count = count;
                Ok(())
            }
            None => Err(ArcherError::invariant("unread called with nothing to undo")),
        }
    }

    pub fn rewind(&mut self, file: &mut File) -> Result<()> {
        let capacity = segment::read_capacity(file, self.start_offset)?;
        self.read = Cursor::fresh(self.start_offset, capacity);
        self.read_count = 0;
        self.unread_snapshot = None;
        Ok(())
    }

    pub fn write_header<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(&self.count.to_be_bytes())?;
        w.write_all(&(self.start_offset as u64).to_be_bytes())?;
        w.write_all(&self.write.segment_offset.to_be_bytes())?;
        w.write_all(&self.write.segment_capacity.to_be_bytes())?;
        w.write_all(&self.write.bytes_used.to_be_bytes())?;
        w.write_all(&self.write.last_di.to_be_bytes())?;
        w.write_all(&self.write.last_pi.to_be_bytes())?;
        w.write_all(&self.read.segment_offset.to_be_bytes())?;
        w.write_all(&self.read.segment_capacity.to_be_bytes())?;
        w.write_all(&self.read.bytes_used.to_be_bytes())?;
        w.write_all(&self.read_count.to_be_bytes())?;
        Ok(())
    }

    pub fn read_header<R: Read>(mut r: R, reservation: usize) -> Result<Self> {
        let mut buf = [0u8; HEADER_RECORD_SIZE];
        r.read_exact(&mut buf)?;
        let mut p = 0usize;
        macro_rules! take {
            ($ty:ty) => {{
                let size = std::mem::size_of::<$ty>();
                let v = <$ty>::from_be_bytes(buf[p..p + size].try_into().unwrap());
                p += size;
                v
            }};
        }
        let count: u64 = take!(u64);
        let start_offset = take!(u64) as i64;
        let write = Cursor {
            segment_offset: take!(i64),
            segment_capacity: take!(u32),
            bytes_used: take!(u32),
            last_di: take!(i32),
            last_pi: take!(i32),
        };
        let read = Cursor {
            segment_offset: take!(i64),
            segment_capacity: take!(u32),
            bytes_used: take!(u32),
            last_di: write.last_di,
            last_pi: write.last_pi,
        };
        let read_count: u64 = take!(u64);
        Ok(Self {
            count,
            start_offset,
            write,
            read,
            read_count,
            unread_snapshot: None,
            reservation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempfile;

    fn postings_from(seq: &[(i32, Vec<i32>, i32)]) -> Vec<Posting> {
        seq.iter()
            .map(|(di, f, pi)| Posting {
                di: *di,
                fields: f.clone(),
                pi: *pi,
            })
            .collect()
    }

    #[test]
    fn round_trip_simple_sequence() {
        let mut f = tempfile().unwrap();
        let mut pv = Pv::init(&mut f, 8).unwrap();
        let seq = postings_from(&[
            (0, vec![], 0),
            (0, vec![1], 1),
            (0, vec![], 5),
            (2, vec![], 0),
            (2, vec![3, 4], 1),
        ]);
        for p in &seq {
            pv.append(&mut f, p.di, &p.fields, p.pi).unwrap();
        }

        let mut out = Vec::new();
        while let Some(p) = pv.read_next(&mut f).unwrap() {
            out.push(p);
        }
        assert_eq!(out, seq);
        assert!(pv.read_next(&mut f).unwrap().is_none());
    }

    #[test]
    fn unread_is_single_step() {
        let mut f = tempfile().unwrap();
        let mut pv = Pv::init(&mut f, 8).unwrap();
        pv.append(&mut f, 0, &[], 0).unwrap();
        pv.append(&mut f, 0, &[], 1).unwrap();

        let first = pv.read_next(&mut f).unwrap().unwrap();
        pv.unread().unwrap();
        let first_again = pv.read_next(&mut f).unwrap().unwrap();
        assert_eq!(first, first_again);

        assert!(pv.unread().is_err() || {
            // one unread succeeded already for this read; a second
            // consecutive unread with nothing new read must fail
            pv.unread().is_err()
        });
    }

    #[test]
    fn out_of_order_append_is_rejected() {
        let mut f = tempfile().unwrap();
        let mut pv = Pv::init(&mut f, 8).unwrap();
        pv.append(&mut f, 5, &[], 3).unwrap();
        assert!(pv.append(&mut f, 5, &[], 2).is_err());
        assert!(pv.append(&mut f, 4, &[], 0).is_err());
    }

    #[test]
    fn segment_overflow_triggers_chaining() {
        let mut f = tempfile().unwrap();
        let mut pv = Pv::init(&mut f, 2).unwrap();
        // Enough postings (with growing deltas) to overflow several
        // geometrically-growing segments.
        let mut expected = Vec::new();
        for i in 0..500i32 {
            pv.append(&mut f, i, &[1, 2], i * 3).unwrap();
            expected.push(Posting {
                di: i,
                fields: vec![1, 2],
                pi: i * 3,
            });
        }
        let mut out = Vec::new();
        while let Some(p) = pv.read_next(&mut f).unwrap() {
            out.push(p);
        }
        assert_eq!(out, expected);
    }

    proptest! {
        #[test]
        fn prop_monotone_sequences_round_trip(
            deltas in proptest::collection::vec((0u8..3, 0u16..50, proptest::collection::vec(0i32..20, 0..3)), 1..60)
        ) {
            let mut f = tempfile().unwrap();
            let mut pv = Pv::init(&mut f, 8).unwrap();
            let mut di = 0i32;
            let mut pi = -1i32;
            let mut expected = Vec::new();
            for (ddi, dpi, fields) in deltas {
                di += ddi as i32;
                if ddi > 0 {
                    pi = dpi as i32;
                } else {
                    pi += 1 + dpi as i32;
                }
                pv.append(&mut f, di, &fields, pi).unwrap();
                expected.push(Posting { di, fields, pi });
            }
            let mut out = Vec::new();
            while let Some(p) = pv.read_next(&mut f).unwrap() {
                out.push(p);
            }
            prop_assert_eq!(out, expected);
        }
    }
}
