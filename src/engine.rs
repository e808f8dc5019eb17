// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The top-level index handle: bundles the vocabulary, doc table, field
//! table, and the two term indexes (spec.md §2 dataflow diagram) behind
//! one `Index` type, and owns the on-disk layout in spec.md §6.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ServerConfig;
use crate::error::{ArcherError, Result};
use crate::keyed_table::{DocRecord, FieldRecord, KeyedTableFile};
use crate::stringid::StringId;
use crate::term_index::TermIndex;

pub struct Index {
    pub data_dir: PathBuf,
    pub vocab: StringId,
    pub docs: KeyedTableFile<DocRecord>,
    pub fields: KeyedTableFile<FieldRecord>,
    pub term_index: TermIndex,
    pub field_index: TermIndex,
    pub config: ServerConfig,
}

fn paths(data_dir: &Path) -> [PathBuf; 8] {
    [
        data_dir.join("vocabulary"),
        data_dir.join("docs.i4k"),
        data_dir.join("docs.array"),
        data_dir.join("labels.i4k"),
        data_dir.join("labels.array"),
        data_dir.join("wi2pv"),
        data_dir.join("li2pv"),
        data_dir.join("pv"), // lipv lives alongside; see below
    ]
}

impl Index {
    pub fn create(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        let config = ServerConfig::load(&data_dir)?;
        let [vocab_path, docs_key, docs_arr, labels_key, labels_arr, wi2pv, li2pv, pv] =
            paths(&data_dir);
        let lipv = data_dir.join("lipv");

        Ok(Self {
            vocab: StringId::new(),
            docs: KeyedTableFile::create(docs_key, docs_arr),
            fields: KeyedTableFile::create(labels_key, labels_arr),
            term_index: TermIndex::create(wi2pv, pv, config.max_fields_per_position)?,
            field_index: TermIndex::create(li2pv, lipv, config.max_fields_per_position)?,
            config,
            data_dir: {
                let _ = vocab_path;
                data_dir
            },
        })
    }

    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let config = ServerConfig::load(&data_dir)?;
        let [vocab_path, docs_key, docs_arr, labels_key, labels_arr, wi2pv, li2pv, pv] =
            paths(&data_dir);
        let lipv = data_dir.join("lipv");

        let vocab = if vocab_path.exists() {
            StringId::read(std::io::BufReader::new(fs::File::open(&vocab_path)?))?
        } else {
            StringId::new()
        };

        Ok(Self {
            vocab,
            docs: KeyedTableFile::open(docs_key, docs_arr)?,
            fields: KeyedTableFile::open(labels_key, labels_arr)?,
            term_index: TermIndex::open(wi2pv, pv, config.max_fields_per_position)?,
            field_index: TermIndex::open(li2pv, lipv, config.max_fields_per_position)?,
            config,
            data_dir,
        })
    }

    pub fn flush(&self) -> Result<()> {
        let vocab_path = self.data_dir.join("vocabulary");
        self.vocab
            .write(std::io::BufWriter::new(fs::File::create(&vocab_path)?))?;
        self.docs.flush()?;
        self.fields.flush()?;
        self.term_index.write_full()?;
        self.field_index.write_full()?;
        Ok(())
    }

    /// Reopens all file handles this index holds, giving the caller (a
    /// new connection handler or worker thread) independent seek
    /// positions. Replaces the original's reopen-after-`fork()` step.
    pub fn reopen(&mut self) -> Result<()> {
        self.term_index.reopen()?;
        self.field_index.reopen()?;
        Ok(())
    }

    /// Builds an independent, lock-free snapshot for a query thread: a
    /// clone of the vocabulary/doc/field tables plus fresh `TermIndex`
    /// views with their own blob-file handles. Callers hold the shared
    /// `RwLock<Index>` only long enough to take this snapshot; the query
    /// itself then runs against it without contending for the lock.
    pub fn snapshot(&self) -> Result<Self> {
        Ok(Self {
            data_dir: self.data_dir.clone(),
            vocab: self.vocab.clone(),
            docs: self.docs.clone(),
            fields: self.fields.clone(),
            term_index: self.term_index.snapshot()?,
            field_index: self.field_index.snapshot()?,
            config: self.config.clone(),
        })
    }

    pub fn live_doc_count(&self) -> usize {
        (0..self.docs.table.len())
            .filter(|&i| {
                self.docs
                    .table
                    .get_by_index(i)
                    .map(|r| r.is_live())
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn doc_path(&self, di: i32) -> Option<&str> {
        if di < 0 {
            return None;
        }
        Some(self.docs.table.key_of(di as usize))
    }

    pub fn is_live(&self, di: i32) -> bool {
        di >= 0
            && self
                .docs
                .table
                .get_by_index(di as usize)
                .map(|r| r.is_live())
                .unwrap_or(false)
    }

    /// Archives (copies) the data directory before a destructive admin
    /// operation, grounded on the original's `barrel.c` backup-before-
    /// rebuild convention (see SPEC_FULL.md).
    pub fn archive(&self, dest: impl AsRef<Path>) -> Result<()> {
        let dest = dest.as_ref();
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let target = dest.join(entry.file_name());
                fs::copy(entry.path(), target)?;
            }
        }
        Ok(())
    }

    /// Canonicalizes `path` before using it as a doc-table key, mirroring
    /// `docnames.c`'s absolute, symlink-resolved keys: indexing the same
    /// file via two different relative paths (or through a symlinked
    /// parent) must resolve to the same key so the tombstone/undelete
    /// path in [`crate::indexer::index_document`] actually fires.
    pub fn path_key(&self, path: &Path) -> Result<String> {
        let canonical = path.canonicalize()?;
        canonical
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| ArcherError::protocol("non-utf8 path"))
    }
}
