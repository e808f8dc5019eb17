// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The position-vector varint: a self-delimiting integer with one type-flag
//! bit (`is_di`) carried in the first byte, per spec.md §3.
//!
//! First byte: bit 7 is the type flag, bit 6 is the continuation bit, bits
//! 5..0 are the low 6 payload bits. Every subsequent byte: bit 7 is the
//! continuation bit, bits 6..0 are the next 7 payload bits. This mirrors
//! `bow_pv_write_unsigned_int` in the original `pv.c` (6 payload bits in
//! byte 0, 7 in every byte after), re-expressed without its manual bit
//!-twiddling macros.

use crate::error::{ArcherError, Result};

const FIRST_BYTE_PAYLOAD_BITS: u32 = 6;
const CONT_BYTE_PAYLOAD_BITS: u32 = 7;
const TYPE_FLAG: u8 = 0x80;
const FIRST_CONT_FLAG: u8 = 0x40;
const FIRST_PAYLOAD_MASK: u8 = 0x3f;
const CONT_FLAG: u8 = 0x80;
const CONT_PAYLOAD_MASK: u8 = 0x7f;

/// Maximum bytes a 64-bit varint can occupy in this encoding: 6 bits then
/// 7-bit groups for the remaining 58 bits (ceil(58/7) = 9), so 10 total.
pub const MAX_VARINT_BYTES: usize = 10;

/// Appends `value` to `buf` as a varint tagged `is_di`.
pub fn encode_varint(value: u64, is_di: bool, buf: &mut Vec<u8>) {
    let flag = if is_di { TYPE_FLAG } else { 0 };
    let first_payload = (value & u64::from(FIRST_PAYLOAD_MASK)) as u8;
    let rest = value >> FIRST_BYTE_PAYLOAD_BITS;

    if rest == 0 {
        buf.push(flag | first_payload);
        return;
    }
    buf.push(flag | FIRST_CONT_FLAG | first_payload);

    let mut rest = rest;
    loop {
        let payload = (rest & u64::from(CONT_PAYLOAD_MASK)) as u8;
        rest >>= CONT_BYTE_PAYLOAD_BITS;
        if rest == 0 {
            buf.push(payload);
            break;
        }
        buf.push(CONT_FLAG | payload);
    }
}

/// Decodes one varint from `buf` starting at `pos`. Returns
/// `(value, is_di, bytes_consumed)`.
pub fn decode_varint(buf: &[u8], pos: usize) -> Result<(u64, bool, usize)> {
    if pos >= buf.len() {
        return Err(ArcherError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "truncated pv varint",
        )));
    }
    let first = buf[pos];
    let is_di = first & TYPE_FLAG != 0;
    let mut value = u64::from(first & FIRST_PAYLOAD_MASK);
    let mut more = first & FIRST_CONT_FLAG != 0;
    let mut shift = FIRST_BYTE_PAYLOAD_BITS;
    let mut consumed = 1;

    while more {
        if consumed >= MAX_VARINT_BYTES {
            return Err(ArcherError::invariant("pv varint too long"));
        }
        let idx = pos + consumed;
        if idx >= buf.len() {
            return Err(ArcherError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "truncated pv varint",
            )));
        }
        let byte = buf[idx];
        value |= u64::from(byte & CONT_PAYLOAD_MASK) << shift;
        more = byte & CONT_FLAG != 0;
        shift += CONT_BYTE_PAYLOAD_BITS;
        consumed += 1;
    }
    Ok((value, is_di, consumed))
}

/// Worst-case encoded size of a posting's `(di_marker, fields, pi_marker)`
/// triple, used by the segment allocator to decide whether a new entry
/// fits in the remaining segment space.
pub fn max_encoded_size(num_fields: usize) -> usize {
    MAX_VARINT_BYTES * (2 + num_fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn small_values_round_trip() {
        for v in [0u64, 1, 63, 64, 127, 128, 1000, u32::MAX as u64] {
            for flag in [true, false] {
                let mut buf = Vec::new();
                encode_varint(v, flag, &mut buf);
                let (decoded, is_di, consumed) = decode_varint(&buf, 0).unwrap();
                assert_eq!(decoded, v);
                assert_eq!(is_di, flag);
                assert_eq!(consumed, buf.len());
            }
        }
    }

    #[test]
    fn zero_fits_in_one_byte() {
        let mut buf = Vec::new();
        encode_varint(0, true, &mut buf);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn sequential_varints_decode_independently() {
        let mut buf = Vec::new();
        encode_varint(5, true, &mut buf);
        encode_varint(300, false, &mut buf);
        encode_varint(70000, true, &mut buf);

        let (v1, f1, c1) = decode_varint(&buf, 0).unwrap();
        assert_eq!((v1, f1), (5, true));
        let (v2, f2, c2) = decode_varint(&buf, c1).unwrap();
        assert_eq!((v2, f2), (300, false));
        let (v3, f3, _) = decode_varint(&buf, c1 + c2).unwrap();
        assert_eq!((v3, f3), (70000, true));
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut buf = Vec::new();
        encode_varint(70000, true, &mut buf);
        buf.truncate(buf.len() - 1);
        assert!(decode_varint(&buf, 0).is_err());
    }

    proptest! {
        #[test]
        fn prop_round_trip(v in any::<u32>(), flag: bool) {
            let mut buf = Vec::new();
            encode_varint(v as u64, flag, &mut buf);
            let (decoded, is_di, consumed) = decode_varint(&buf, 0).unwrap();
            prop_assert_eq!(decoded, v as u64);
            prop_assert_eq!(is_di, flag);
            prop_assert_eq!(consumed, buf.len());
        }
    }
}
