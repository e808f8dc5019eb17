// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Indexer (spec.md §4.6): drives the tagged lexer over one document,
//! allocating a doc id and writing `(wi, di, [li...], pi)` postings into
//! the term and field indexes.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::engine::Index;
use crate::error::Result;
use crate::keyed_table::{DocRecord, FieldRecord};
use crate::lexer::{normalize, Event, Lexer};

/// Indexes `text` under `path`. If `path` names a tombstoned document,
/// flips it back to live (undelete) instead of re-indexing, mirroring
/// spec.md §4.6 step 1.
pub fn index_document(index: &mut Index, path: &str, text: &str) -> Result<i32> {
    if let Some(existing_idx) = index.docs.table.index_of(path) {
        let rec = index.docs.table.get_by_index(existing_idx).unwrap().clone();
        if rec.is_tombstoned() {
            let undeleted = DocRecord {
                word_count: -rec.word_count,
                ..rec
            };
            index.docs.update_record(existing_idx, undeleted)?;
            debug!(path, "undeleted tombstoned document");
            return Ok(existing_idx as i32);
        }
        // Already live: re-indexing a live document is a no-op per the
        // idempotent-intern discipline the rest of the index relies on.
        return Ok(existing_idx as i32);
    }

    let di = index.docs.add_inc(
        path,
        DocRecord {
            tag: 0,
            word_count: 0,
            di: 0,
        },
    )? as i32;

    let mut pi: i32 = 0;
    let mut skip_depth: u32 = 0;
    let mut pending_labels: Vec<i32> = Vec::new();

    for event in Lexer::new(text) {
        match event {
            Event::LabelOpen { name, .. } if name == "skip" => {
                skip_depth += 1;
            }
            Event::LabelClose { name, .. } if name == "skip" => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Event::LabelOpen { name, .. } => {
                let li = intern_field(index, name)?;
                if !pending_labels.contains(&li) {
                    if pending_labels.len() >= index.config.max_fields_per_position {
                        debug!(
                            path,
                            max = index.config.max_fields_per_position,
                            "dropping label: max_fields_per_position reached for this position"
                        );
                    } else {
                        pending_labels.push(li);
                    }
                }
            }
            Event::LabelClose { name, .. } => {
                if let Some(li) = field_id(index, name) {
                    pending_labels.retain(|&x| x != li);
                }
            }
            Event::Term { text: term, .. } if skip_depth == 0 => {
                let normalized = normalize(term);
                let wi = index.vocab.intern(&normalized);
                index.term_index.append(wi, di, &pending_labels, pi)?;
                for &li in &pending_labels {
                    index.field_index.append(li, di, &[], pi)?;
                    bump_field_word_count(index, li);
                }
                pi += 1;
                pending_labels.clear();
            }
            Event::Term { .. } => {}
        }
    }

    index.docs.update_record(
        di as usize,
        DocRecord {
            tag: 0,
            word_count: pi,
            di,
        },
    )?;
    debug!(path, words = pi, "indexed document");
    Ok(di)
}

fn field_id(index: &Index, name: &str) -> Option<i32> {
    index.fields.table.index_of(name).map(|i| i as i32)
}

fn intern_field(index: &mut Index, name: &str) -> Result<i32> {
    if let Some(i) = index.fields.table.index_of(name) {
        return Ok(i as i32);
    }
    let idx = index.fields.add_inc(
        name,
        FieldRecord {
            word_count: 0,
            li: 0,
        },
    )?;
    index.fields.update_record(
        idx,
        FieldRecord {
            word_count: 0,
            li: idx as i32,
        },
    )?;
    Ok(idx as i32)
}

fn bump_field_word_count(index: &mut Index, li: i32) {
    if let Some(rec) = index.fields.table.get_by_index(li as usize).cloned() {
        let _ = index.fields.update_record(
            li as usize,
            FieldRecord {
                word_count: rec.word_count + 1,
                li: rec.li,
            },
        );
    }
}

/// Tombstones a document by path (spec.md §3 "Document-id lifecycle").
pub fn delete_document(index: &mut Index, path: &str) -> Result<bool> {
    let Some(idx) = index.docs.table.index_of(path) else {
        return Ok(false);
    };
    let rec = index.docs.table.get_by_index(idx).unwrap().clone();
    if rec.is_tombstoned() {
        return Ok(false);
    }
    index.docs.update_record(
        idx,
        DocRecord {
            word_count: -rec.word_count,
            ..rec
        },
    )?;
    Ok(true)
}

/// Recursively indexes every regular file under `root` (the `--index DIR`
/// CLI surface, spec.md §6).
pub fn index_directory(index: &mut Index, root: &Path) -> Result<usize> {
    let mut count = 0;
    index_directory_inner(index, root, &mut count)?;
    Ok(count)
}

fn index_directory_inner(index: &mut Index, dir: &Path, count: &mut usize) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            index_directory_inner(index, &path, count)?;
        } else if entry.file_type()?.is_file() {
            let text = fs::read_to_string(&path).unwrap_or_default();
            let key = index.path_key(&path)?;
            index_document(index, &key, &text)?;
            *count += 1;
        }
    }
    Ok(())
}

/// Indexes each line of `path` as a separate document (`--index-lines`),
/// keyed as `path:line_number`.
pub fn index_lines(index: &mut Index, path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path)?;
    let mut count = 0;
    for (n, line) in text.lines().enumerate() {
        let key = format!("{}:{}", path.display(), n);
        index_document(index, &key, line)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fresh_index() -> (tempfile::TempDir, Index) {
        let dir = tempdir().unwrap();
        let idx = Index::create(dir.path()).unwrap();
        (dir, idx)
    }

    #[test]
    fn indexes_plain_terms_in_order() {
        let (_dir, mut idx) = fresh_index();
        let di = index_document(&mut idx, "a.txt", "foo bar foo").unwrap();
        assert_eq!(di, 0);

        let wi_foo = idx.vocab.lookup("foo");
        let first = idx.term_index.read_next(wi_foo).unwrap().unwrap();
        assert_eq!((first.di, first.pi), (0, 0));
        let second = idx.term_index.read_next(wi_foo).unwrap().unwrap();
        assert_eq!((second.di, second.pi), (0, 2));
    }

    #[test]
    fn field_tags_attach_to_the_next_term_only() {
        let (_dir, mut idx) = fresh_index();
        index_document(&mut idx, "a.txt", "<title>foo</title> bar").unwrap();

        let li_title = idx.fields.table.index_of("title").unwrap() as i32;
        let wi_foo = idx.vocab.lookup("foo");
        let posting = idx.term_index.read_next(wi_foo).unwrap().unwrap();
        assert_eq!(posting.fields, vec![li_title]);

        let wi_bar = idx.vocab.lookup("bar");
        let posting = idx.term_index.read_next(wi_bar).unwrap().unwrap();
        assert!(posting.fields.is_empty());
    }

    #[test]
    fn skip_region_excludes_terms() {
        let (_dir, mut idx) = fresh_index();
        index_document(&mut idx, "a.txt", "a <skip>secret</skip> b").unwrap();
        assert_eq!(idx.vocab.lookup("secret"), -1);
        assert_eq!(idx.docs.table.get_by_key("a.txt").unwrap().word_count, 2);
    }

    #[test]
    fn delete_then_reindex_reuses_di() {
        let (_dir, mut idx) = fresh_index();
        let di = index_document(&mut idx, "a.txt", "foo").unwrap();
        assert!(delete_document(&mut idx, "a.txt").unwrap());
        assert!(!idx.is_live(di));

        let di2 = index_document(&mut idx, "a.txt", "ignored text").unwrap();
        assert_eq!(di, di2);
        assert!(idx.is_live(di2));
    }

    #[test]
    fn empty_label_pair_does_not_tag_anything() {
        let (_dir, mut idx) = fresh_index();
        index_document(&mut idx, "a.txt", "<title></title>foo").unwrap();
        let wi_foo = idx.vocab.lookup("foo");
        let posting = idx.term_index.read_next(wi_foo).unwrap().unwrap();
        assert!(posting.fields.is_empty());
    }
}
