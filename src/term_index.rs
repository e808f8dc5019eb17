// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Term/field index: maps a term id (`wi`) or field id (`li`) to its
//! [`Pv`] (spec.md §4.4). One [`TermIndex`] instance backs both `wi2pv`
//! and `li2pv` — it is generic over which vocabulary it is keyed by.
//!
//! The header file (`num_words`, `next_word`, then one `Pv` header record
//! per allocated `wi`) is kept separate from the blob file so that
//! rewriting a single entry's cursor state never touches posting bytes.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pv::{Posting, Pv};

const HEADER_MAGIC: &[u8; 8] = b"archerTI";
const PV_HEADER_RECORD_SIZE: usize = 8 + 8 + 8 + 4 + 4 + 4 + 4 + 8 + 4 + 4 + 8;

pub struct TermIndex {
    entries: Vec<Option<Pv>>,
    header_path: PathBuf,
    blob_path: PathBuf,
    blob: File,
    max_fields_per_position: usize,
}

impl TermIndex {
    pub fn create(header_path: impl AsRef<Path>, blob_path: impl AsRef<Path>, max_fields_per_position: usize) -> Result<Self> {
        let blob = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(blob_path.as_ref())?;
        Ok(Self {
            entries: Vec::new(),
            header_path: header_path.as_ref().to_path_buf(),
            blob_path: blob_path.as_ref().to_path_buf(),
            blob,
            max_fields_per_position,
        })
    }

    pub fn open(header_path: impl AsRef<Path>, blob_path: impl AsRef<Path>, max_fields_per_position: usize) -> Result<Self> {
        let header_path = header_path.as_ref().to_path_buf();
        let blob_path = blob_path.as_ref().to_path_buf();
        let blob = OpenOptions::new().read(true).write(true).open(&blob_path)?;

        let mut entries = Vec::new();
        if header_path.exists() {
            let mut r = BufReader::new(File::open(&header_path)?);
            let mut magic = [0u8; 8];
            r.read_exact(&mut magic)?;
            if &magic != HEADER_MAGIC {
                return Err(crate::error::ArcherError::invariant("bad term-index header magic"));
            }
            let mut len_buf = [0u8; 8];
            r.read_exact(&mut len_buf)?;
            let next_word = u64::from_be_bytes(len_buf) as usize;
            for _ in 0..next_word {
                let mut present = [0u8; 1];
                r.read_exact(&mut present)?;
                if present[0] == 0 {
                    entries.push(None);
                } else {
                    entries.push(Some(Pv::read_header(&mut r, reservation_for(max_fields_per_position))?));
                }
            }
        }

        Ok(Self {
            entries,
            header_path,
            blob_path,
            blob,
            max_fields_per_position,
        })
    }

    /// Reopens the blob file handle, giving this `TermIndex` an
    /// independent seek position. Replaces the original's
    /// reopen-after-`fork()` hack (see SPEC_FULL.md Design Notes): call
    /// this whenever a new worker (thread or connection) starts using a
    /// `TermIndex` cloned from a shared snapshot.
    pub fn reopen(&mut self) -> Result<()> {
        self.blob = OpenOptions::new().read(true).write(true).open(&self.blob_path)?;
        Ok(())
    }

    /// Builds an independent read-only view of this index: a clone of
    /// every [`Pv`] cursor plus a freshly opened handle to the same blob
    /// file. Used by the server to hand each connection thread its own
    /// snapshot instead of sharing one `TermIndex` behind a lock for the
    /// lifetime of a query (replaces the original's "readers see the
    /// pre-fork snapshot until they reopen" semantics; see SPEC_FULL.md).
    pub fn snapshot(&self) -> Result<Self> {
        let blob = OpenOptions::new().read(true).write(true).open(&self.blob_path)?;
        Ok(Self {
            entries: self.entries.clone(),
            header_path: self.header_path.clone(),
            blob_path: self.blob_path.clone(),
            blob,
            max_fields_per_position: self.max_fields_per_position,
        })
    }

    fn ensure_slot(&mut self, id: i32) -> Result<()> {
        let id = id as usize;
        if id >= self.entries.len() {
            self.entries.resize(id + 1, None);
        }
        if self.entries[id].is_none() {
            self.entries[id] = Some(Pv::init(&mut self.blob, self.max_fields_per_position)?);
        }
        Ok(())
    }

    pub fn append(&mut self, id: i32, di: i32, fields: &[i32], pi: i32) -> Result<()> {
        self.ensure_slot(id)?;
        self.entries[id as usize]
            .as_mut()
            .unwrap()
            .append(&mut self.blob, di, fields, pi)
    }

    pub fn read_next(&mut self, id: i32) -> Result<Option<Posting>> {
        match self.entries.get_mut(id as usize).and_then(|e| e.as_mut()) {
            Some(pv) => pv.read_next(&mut self.blob),
            None => Ok(None),
        }
    }

    pub fn unread(&mut self, id: i32) -> Result<()> {
        self.entries[id as usize].as_mut().unwrap().unread()
    }

    pub fn rewind(&mut self, id: i32) -> Result<()> {
        if let Some(Some(pv)) = self.entries.get_mut(id as usize) {
            pv.rewind(&mut self.blob)?;
        }
        Ok(())
    }

    pub fn doc_freq(&self, id: i32) -> u64 {
        self.entries
            .get(id as usize)
            .and_then(|e| e.as_ref())
            .map(|pv| pv.count)
            .unwrap_or(0)
    }

    pub fn has_postings(&self, id: i32) -> bool {
        id >= 0 && (id as usize) < self.entries.len() && self.entries[id as usize].is_some()
    }

    pub fn write_full(&self) -> Result<()> {
        let mut w = BufWriter::new(File::create(&self.header_path)?);
        w.write_all(HEADER_MAGIC)?;
        w.write_all(&(self.entries.len() as u64).to_be_bytes())?;
        for e in &self.entries {
            match e {
                None => w.write_all(&[0u8])?,
                Some(pv) => {
                    w.write_all(&[1u8])?;
                    pv.write_header(&mut w)?;
                }
            }
        }
        Ok(())
    }

    /// Rewrites just entry `id`'s header record in place, without
    /// touching the rest of the header file (spec.md §4.4 `write_header`).
    pub fn write_header_record(&self, id: i32) -> Result<()> {
        let id = id as usize;
        let pv = match self.entries.get(id).and_then(|e| e.as_ref()) {
            Some(pv) => pv,
            None => return Ok(()),
        };
        let offset = 8 + 8 + id * (1 + PV_HEADER_RECORD_SIZE);
        let mut f = OpenOptions::new().write(true).open(&self.header_path)?;
        f.seek(SeekFrom::Start(offset as u64))?;
        f.write_all(&[1u8])?;
        pv.write_header(&mut f)?;
        Ok(())
    }
}

fn reservation_for(max_fields_per_position: usize) -> usize {
    crate::pv::varint::max_encoded_size(max_fields_per_position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_and_read_back_multiple_terms() {
        let dir = tempdir().unwrap();
        let mut idx = TermIndex::create(dir.path().join("wi2pv"), dir.path().join("pv"), 8).unwrap();

        idx.append(0, 0, &[], 0).unwrap();
        idx.append(0, 0, &[], 2).unwrap();
        idx.append(1, 1, &[], 0).unwrap();

        assert_eq!(idx.read_next(0).unwrap().unwrap().pi, 0);
        assert_eq!(idx.read_next(0).unwrap().unwrap().pi, 2);
        assert!(idx.read_next(0).unwrap().is_none());
        assert_eq!(idx.read_next(1).unwrap().unwrap().di, 1);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempdir().unwrap();
        let header_path = dir.path().join("wi2pv");
        let blob_path = dir.path().join("pv");

        {
            let mut idx = TermIndex::create(&header_path, &blob_path, 8).unwrap();
            idx.append(5, 10, &[2], 3).unwrap();
            idx.write_full().unwrap();
        }

        let mut idx = TermIndex::open(&header_path, &blob_path, 8).unwrap();
        let p = idx.read_next(5).unwrap().unwrap();
        assert_eq!((p.di, p.pi, p.fields), (10, 3, vec![2]));
    }
}
