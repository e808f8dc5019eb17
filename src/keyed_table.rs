// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! String-keyed arrays of fixed-size records: the doc table and field
//! table (spec.md §4.2, on-disk layout in §6).
//!
//! Each table pairs a [`StringId`](crate::stringid::StringId) (the key —
//! pathname or field name) with a `Vec<R>` of fixed-size records. The two
//! halves are persisted to a `.i4k` file (the key map, same format as the
//! vocabulary) and a `.array` file (`count: i32 be` header followed by
//! `count` fixed-size records, each `R::SIZE` bytes, big-endian).
//!
//! Updating a single record in place (tombstoning a doc, adjusting a
//! `word_count`) is a seek to `4 + index * R::SIZE` followed by a
//! `R::SIZE`-byte rewrite — no need to touch the rest of the file.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{ArcherError, Result};
use crate::stringid::StringId;

/// A fixed-size, big-endian-encodable record.
pub trait Record: Sized + Clone {
    const SIZE: usize;
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(buf: &[u8]) -> Result<Self>;
}

#[derive(Debug, Clone)]
pub struct DocRecord {
    /// Retained for compatibility with the original's classification
    /// front-end (`train`/`test`/... tags); the core only distinguishes
    /// tombstoned (`word_count <= 0`, not yet populated) vs. live.
    pub tag: i32,
    pub word_count: i32,
    pub di: i32,
}

impl Record for DocRecord {
    const SIZE: usize = 12;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.tag.to_be_bytes());
        buf.extend_from_slice(&self.word_count.to_be_bytes());
        buf.extend_from_slice(&self.di.to_be_bytes());
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(ArcherError::invariant("truncated doc record"));
        }
        Ok(Self {
            tag: i32::from_be_bytes(buf[0..4].try_into().unwrap()),
            word_count: i32::from_be_bytes(buf[4..8].try_into().unwrap()),
            di: i32::from_be_bytes(buf[8..12].try_into().unwrap()),
        })
    }
}

impl DocRecord {
    pub fn is_live(&self) -> bool {
        self.word_count > 0
    }

    pub fn is_tombstoned(&self) -> bool {
        self.word_count < 0
    }
}

#[derive(Debug, Clone)]
pub struct FieldRecord {
    pub word_count: i32,
    pub li: i32,
}

impl Record for FieldRecord {
    const SIZE: usize = 8;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.word_count.to_be_bytes());
        buf.extend_from_slice(&self.li.to_be_bytes());
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(ArcherError::invariant("truncated field record"));
        }
        Ok(Self {
            word_count: i32::from_be_bytes(buf[0..4].try_into().unwrap()),
            li: i32::from_be_bytes(buf[4..8].try_into().unwrap()),
        })
    }
}

#[derive(Clone)]
pub struct KeyedTable<R: Record> {
    keys: StringId,
    records: Vec<R>,
}

impl<R: Record> KeyedTable<R> {
    pub fn new() -> Self {
        Self {
            keys: StringId::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        let id = self.keys.lookup(key);
        if id < 0 {
            None
        } else {
            Some(id as usize)
        }
    }

    pub fn key_of(&self, index: usize) -> &str {
        self.keys.get(index as i32)
    }

    pub fn get_by_index(&self, index: usize) -> Option<&R> {
        self.records.get(index)
    }

    pub fn get_by_key(&self, key: &str) -> Option<&R> {
        self.index_of(key).and_then(|i| self.records.get(i))
    }

    /// Appends a new `(key, record)` pair. Fails with `Duplicate` if `key`
    /// is already present (mirrors the original's `add` contract).
    pub fn add(&mut self, key: &str, record: R) -> Result<usize> {
        if self.index_of(key).is_some() {
            return Err(ArcherError::Duplicate(key.to_string()));
        }
        let id = self.keys.intern(key);
        debug_assert_eq!(id as usize, self.records.len());
        self.records.push(record);
        Ok(id as usize)
    }

    /// Rewrites record `index` in place.
    pub fn set(&mut self, index: usize, record: R) {
        self.records[index] = record;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.records
            .iter()
            .enumerate()
            .map(move |(i, r)| (self.key_of(i), r))
    }

    pub fn write(&self, key_w: impl Write, array_w: impl Write) -> Result<()> {
        self.keys.write(key_w)?;
        let mut array_w = array_w;
        array_w.write_all(&(self.records.len() as i32).to_be_bytes())?;
        for r in &self.records {
            array_w.write_all(&r.to_bytes())?;
        }
        Ok(())
    }

    pub fn read(key_r: impl io::BufRead, mut array_r: impl Read) -> Result<Self> {
        let keys = StringId::read(key_r)?;
        let mut len_buf = [0u8; 4];
        array_r.read_exact(&mut len_buf)?;
        let count = i32::from_be_bytes(len_buf) as usize;
        let mut records = Vec::with_capacity(count);
        let mut rec_buf = vec![0u8; R::SIZE];
        for _ in 0..count {
            array_r.read_exact(&mut rec_buf)?;
            records.push(R::from_bytes(&rec_buf)?);
        }
        Ok(Self { keys, records })
    }
}

impl<R: Record> Default for KeyedTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// File-backed handle pairing a [`KeyedTable`] with the two files it
/// persists to, supporting the incremental `write_inc`/update-in-place
/// operations spec.md §4.2 describes.
#[derive(Clone)]
pub struct KeyedTableFile<R: Record> {
    pub table: KeyedTable<R>,
    key_path: std::path::PathBuf,
    array_path: std::path::PathBuf,
}

impl<R: Record> KeyedTableFile<R> {
    pub fn create(key_path: impl AsRef<Path>, array_path: impl AsRef<Path>) -> Self {
        Self {
            table: KeyedTable::new(),
            key_path: key_path.as_ref().to_path_buf(),
            array_path: array_path.as_ref().to_path_buf(),
        }
    }

    pub fn open(key_path: impl AsRef<Path>, array_path: impl AsRef<Path>) -> Result<Self> {
        let key_path = key_path.as_ref().to_path_buf();
        let array_path = array_path.as_ref().to_path_buf();
        let table = if key_path.exists() && array_path.exists() {
            let key_f = BufReader::new(File::open(&key_path)?);
            let array_f = BufReader::new(File::open(&array_path)?);
            KeyedTable::read(key_f, array_f)?
        } else {
            KeyedTable::new()
        };
        Ok(Self {
            table,
            key_path,
            array_path,
        })
    }

    pub fn flush(&self) -> Result<()> {
        let key_f = BufWriter::new(File::create(&self.key_path)?);
        let array_f = BufWriter::new(File::create(&self.array_path)?);
        self.table.write(key_f, array_f)
    }

    /// Rewrites a single record at `index` without touching the rest of
    /// the array file: seek to `4 + index * R::SIZE`, write `R::SIZE`
    /// bytes.
    pub fn update_record(&mut self, index: usize, record: R) -> Result<()> {
        self.table.set(index, record.clone());
        let mut f = OpenOptions::new().write(true).open(&self.array_path)?;
        let offset = 4 + (index * R::SIZE) as u64;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(&record.to_bytes())?;
        Ok(())
    }

    /// Appends a new record to both the in-memory table and the on-disk
    /// array/key files, without rewriting what is already there.
    pub fn add_inc(&mut self, key: &str, record: R) -> Result<usize> {
        let idx = self.table.add(key, record.clone())?;
        let mut array_f = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.array_path)?;
        if array_f.metadata()?.len() == 0 {
            array_f.write_all(&0i32.to_be_bytes())?;
        }
        array_f.seek(SeekFrom::End(0))?;
        array_f.write_all(&record.to_bytes())?;
        // patch the count header
        let count = self.table.len() as i32;
        array_f.seek(SeekFrom::Start(0))?;
        array_f.write_all(&count.to_be_bytes())?;

        let mut key_f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.key_path)?;
        if key_f.metadata()?.len() == 0 {
            use std::io::Write as _;
            write!(key_f, "bow_int4str\n")?;
            writeln!(key_f, "0")?;
        }
        writeln!(key_f, "{key}")?;
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_and_lookup() {
        let mut t: KeyedTable<DocRecord> = KeyedTable::new();
        let idx = t
            .add(
                "a.txt",
                DocRecord {
                    tag: 0,
                    word_count: 3,
                    di: 0,
                },
            )
            .unwrap();
        assert_eq!(idx, 0);
        assert!(t.add("a.txt", DocRecord { tag: 0, word_count: 3, di: 0 }).is_err());
        assert_eq!(t.get_by_key("a.txt").unwrap().word_count, 3);
    }

    #[test]
    fn round_trip_file() {
        let dir = tempdir().unwrap();
        let key_path = dir.path().join("docs.i4k");
        let array_path = dir.path().join("docs.array");

        let mut f: KeyedTableFile<DocRecord> = KeyedTableFile::create(&key_path, &array_path);
        f.table
            .add("a.txt", DocRecord { tag: 0, word_count: 3, di: 0 })
            .unwrap();
        f.table
            .add("b.txt", DocRecord { tag: 0, word_count: 5, di: 1 })
            .unwrap();
        f.flush().unwrap();

        let reopened: KeyedTableFile<DocRecord> = KeyedTableFile::open(&key_path, &array_path).unwrap();
        assert_eq!(reopened.table.len(), 2);
        assert_eq!(reopened.table.get_by_key("b.txt").unwrap().word_count, 5);
    }

    #[test]
    fn tombstone_via_update_record() {
        let dir = tempdir().unwrap();
        let key_path = dir.path().join("docs.i4k");
        let array_path = dir.path().join("docs.array");

        let mut f: KeyedTableFile<DocRecord> = KeyedTableFile::create(&key_path, &array_path);
        f.table
            .add("a.txt", DocRecord { tag: 0, word_count: 3, di: 0 })
            .unwrap();
        f.flush().unwrap();

        f.update_record(0, DocRecord { tag: 0, word_count: -3, di: 0 }).unwrap();
        let reopened: KeyedTableFile<DocRecord> = KeyedTableFile::open(&key_path, &array_path).unwrap();
        assert!(reopened.table.get_by_index(0).unwrap().is_tombstoned());
    }

    #[test]
    fn add_inc_appends_without_full_rewrite() {
        let dir = tempdir().unwrap();
        let key_path = dir.path().join("docs.i4k");
        let array_path = dir.path().join("docs.array");

        let mut f: KeyedTableFile<DocRecord> = KeyedTableFile::create(&key_path, &array_path);
        f.add_inc("a.txt", DocRecord { tag: 0, word_count: 3, di: 0 }).unwrap();
        f.add_inc("b.txt", DocRecord { tag: 0, word_count: 1, di: 1 }).unwrap();

        let reopened: KeyedTableFile<DocRecord> = KeyedTableFile::open(&key_path, &array_path).unwrap();
        assert_eq!(reopened.table.len(), 2);
        assert_eq!(reopened.table.get_by_key("a.txt").unwrap().di, 0);
    }
}
