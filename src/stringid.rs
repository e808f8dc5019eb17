// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Bijective string/id map (the `int4str` table).
//!
//! Ids are assigned in first-seen order and never change once assigned, so
//! a `StringId` can be persisted as a flat newline-delimited list: line `i`
//! is the string with id `i`. Lookup in the other direction goes through an
//! in-memory hash map built on load.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use crate::error::{ArcherError, Result};

const MAGIC: &str = "bow_int4str\n";

#[derive(Debug, Default, Clone)]
pub struct StringId {
    strings: Vec<String>,
    index: HashMap<String, i32>,
}

impl StringId {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `s` if not already present and returns its id. Stable: the
    /// same string always maps to the same id for the lifetime of the map.
    pub fn intern(&mut self, s: &str) -> i32 {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = self.strings.len() as i32;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), id);
        id
    }

    /// Side-effect-free lookup; returns `-1` (per spec.md §3) if unknown.
    pub fn lookup(&self, s: &str) -> i32 {
        self.index.get(s).copied().unwrap_or(-1)
    }

    pub fn get(&self, id: i32) -> &str {
        &self.strings[id as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (i as i32, s.as_str()))
    }

    /// Writes the full table: magic header, decimal count, one string per
    /// line. Fails rather than silently truncate a string containing `\n`.
    pub fn write<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(MAGIC.as_bytes())?;
        writeln!(w, "{}", self.strings.len())?;
        for s in &self.strings {
            if s.contains('\n') {
                return Err(ArcherError::invariant(
                    "string-id entry must not contain a newline",
                ));
            }
            writeln!(w, "{s}")?;
        }
        Ok(())
    }

    /// Reads a full table previously written by [`Self::write`].
    pub fn read<R: BufRead>(mut r: R) -> Result<Self> {
        let mut magic = String::new();
        r.read_line(&mut magic)?;
        if magic != MAGIC {
            return Err(ArcherError::invariant("bad string-id magic header"));
        }
        let mut count_line = String::new();
        r.read_line(&mut count_line)?;
        let count: usize = count_line
            .trim()
            .parse()
            .map_err(|_| ArcherError::invariant("bad string-id count"))?;

        let mut table = Self::new();
        for _ in 0..count {
            let mut line = String::new();
            let n = r.read_line(&mut line)?;
            if n == 0 {
                return Err(ArcherError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated string-id table",
                )));
            }
            if line.ends_with('\n') {
                line.pop();
            }
            table.intern(&line);
        }
        Ok(table)
    }

    /// Appends raw lines (no header, no count) until EOF. Used by a server
    /// to pick up vocabulary entries appended by a concurrent reindex
    /// without re-reading the whole file.
    pub fn read_inc<R: BufRead>(&mut self, r: R) -> Result<usize> {
        let mut added = 0;
        for line in r.lines() {
            let line = line?;
            self.intern(&line);
            added += 1;
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable_and_idempotent() {
        let mut t = StringId::new();
        let a = t.intern("foo");
        let b = t.intern("bar");
        let a2 = t.intern("foo");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(t.get(a), "foo");
    }

    #[test]
    fn lookup_unknown_is_negative_one() {
        let t = StringId::new();
        assert_eq!(t.lookup("nope"), -1);
    }

    #[test]
    fn round_trip_write_read() {
        let mut t = StringId::new();
        t.intern("alpha");
        t.intern("beta");
        t.intern("gamma");

        let mut buf = Vec::new();
        t.write(&mut buf).unwrap();

        let t2 = StringId::read(io::Cursor::new(buf)).unwrap();
        assert_eq!(t2.len(), 3);
        assert_eq!(t2.lookup("beta"), t.lookup("beta"));
        assert_eq!(t2.get(0), "alpha");
    }

    #[test]
    fn rejects_embedded_newline() {
        let mut t = StringId::new();
        t.intern("ok");
        // Can't intern a literal newline through the public API cleanly,
        // so exercise the write-time guard directly by constructing one.
        t.strings.push("bad\nline".to_string());
        let mut buf = Vec::new();
        assert!(t.write(&mut buf).is_err());
    }

    #[test]
    fn read_inc_appends_without_header() {
        let mut t = StringId::new();
        t.intern("one");
        let more = "two\nthree\n";
        let added = t.read_inc(io::Cursor::new(more)).unwrap();
        assert_eq!(added, 2);
        assert_eq!(t.len(), 3);
        assert_eq!(t.lookup("three"), 2);
    }
}
