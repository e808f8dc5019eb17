// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Dump & highlight (spec.md §4.10): re-lexes a document's source text and
//! wraps every token whose position is in a query's match set with
//! `<match>…</match>`, XML-escaping everything else. Used by the server's
//! `dump`/`ndump` commands to show a hit in context.

use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::Index;
use crate::error::{ArcherError, Result};
use crate::lexer::{Event, Lexer};
use crate::query::SearchResult;

/// Union of all positions any word-occurrence in `result` matched at,
/// sorted and deduplicated (spec.md §4.10 step 1).
pub fn matching_positions(result: &SearchResult) -> Vec<i32> {
    let mut positions: Vec<i32> = result
        .word_occurrences
        .iter()
        .flat_map(|wo| wo.positions.iter().copied())
        .collect();
    positions.sort_unstable();
    positions.dedup();
    positions
}

/// Escapes `<`, `>`, `&`, `'`, `"` and strips control characters other
/// than whitespace (spec.md §6 wire protocol).
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            c if c.is_control() && c != '\n' && c != '\t' && c != '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Re-lexes `text`, wrapping the token at each position in `matching_pis`
/// with `<match>…</match>` and XML-escaping everything in between
/// (spec.md §4.10 steps 2-4). Position numbering here must track the
/// indexer's exactly: a `skip` region still advances the lexer but not
/// `pi`, so it cannot advance the match cursor either.
pub fn highlight(text: &str, matching_pis: &[i32]) -> String {
    let mut out = String::new();
    let mut cursor = 0usize;
    let mut pi: i32 = 0;
    let mut skip_depth: u32 = 0;
    let mut match_idx = 0usize;

    for event in Lexer::new(text) {
        match event {
            Event::LabelOpen { name, .. } if name == "skip" => skip_depth += 1,
            Event::LabelClose { name, .. } if name == "skip" => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Event::LabelOpen { .. } | Event::LabelClose { .. } => {}
            Event::Term { start, end, .. } if skip_depth == 0 => {
                out.push_str(&xml_escape(&text[cursor..start]));
                let is_match = matching_pis.get(match_idx) == Some(&pi);
                if is_match {
                    out.push_str("<match>");
                    match_idx += 1;
                }
                out.push_str(&xml_escape(&text[start..end]));
                if is_match {
                    out.push_str("</match>");
                }
                cursor = end;
                pi += 1;
            }
            Event::Term { .. } => {}
        }
    }
    out.push_str(&xml_escape(&text[cursor..]));
    out
}

/// Reads a document's source text for dumping: `override_path` wins if
/// given, otherwise the document's own key is treated as a filesystem
/// path (the common case for `--index DIR`; `--index-lines` documents
/// need an explicit override since their key is `path:line_number`).
pub fn read_source(index: &Index, di: i32, override_path: Option<&Path>) -> Result<String> {
    if let Some(p) = override_path {
        return Ok(fs::read_to_string(p)?);
    }
    let key = index
        .doc_path(di)
        .ok_or_else(|| ArcherError::NoSuchDocument(PathBuf::from(di.to_string())))?;
    Ok(fs::read_to_string(key)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_matching_positions_only() {
        let text = "foo bar foo";
        let out = highlight(text, &[0]);
        assert_eq!(out, "<match>foo</match> bar foo");
    }

    #[test]
    fn skip_region_does_not_shift_position_numbering() {
        let text = "a <skip>secret</skip> b";
        // "b" is position 1 (skip doesn't count), matching it must not
        // accidentally match "a" at position 0.
        let out = highlight(text, &[1]);
        assert!(out.contains("<match>b</match>"));
        assert!(!out.contains("<match>a</match>"));
    }

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(xml_escape("<a> & 'b' \"c\""), "&lt;a&gt; &amp; &apos;b&apos; &quot;c&quot;");
    }
}
