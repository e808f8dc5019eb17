// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Per-term posting sources for the query executor (spec.md §4.8).
//!
//! Each [`TermSource`] wraps a PV read cursor plus a small in-memory
//! lookahead buffer. The one-step `Pv::unread` the PV store exposes isn't
//! enough here: a chain's doc-at-a-time merge needs to peek a term's next
//! document id repeatedly before deciding whether to consume it, so the
//! buffering happens at this layer instead of leaning on the PV's own
//! (single-step) undo.

use crate::engine::Index;
use crate::error::Result;
use crate::pv::Posting;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Term,
    Field,
}

fn read_next(index: &mut Index, table: Table, id: i32) -> Result<Option<Posting>> {
    match table {
        Table::Term => index.term_index.read_next(id),
        Table::Field => index.field_index.read_next(id),
    }
}

/// Buffered forward cursor over one id's PV.
struct IdCursor {
    table: Table,
    id: i32,
    pending: Option<Posting>,
    exhausted: bool,
}

impl IdCursor {
    fn new(table: Table, id: i32) -> Self {
        Self {
            table,
            id,
            pending: None,
            exhausted: id < 0,
        }
    }

    fn fill(&mut self, index: &mut Index) -> Result<()> {
        if self.pending.is_none() && !self.exhausted {
            match read_next(index, self.table, self.id)? {
                Some(p) => self.pending = Some(p),
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    fn peek_di(&mut self, index: &mut Index) -> Result<Option<i32>> {
        self.fill(index)?;
        Ok(self.pending.as_ref().map(|p| p.di))
    }

    /// Consumes every buffered posting for doc `di`, returning them.
    fn take_for_doc(&mut self, index: &mut Index, di: i32) -> Result<Vec<Posting>> {
        let mut out = Vec::new();
        loop {
            self.fill(index)?;
            match &self.pending {
                Some(p) if p.di == di => out.push(self.pending.take().unwrap()),
                _ => break,
            }
        }
        Ok(out)
    }
}

/// One leaf of a proximity chain: a word (optionally field-restricted) or
/// a bare field probe (spec.md §4.7 `TermNode`).
pub struct TermSource {
    word_cursor: Option<IdCursor>,
    field_filter: Vec<i32>,
    field_cursors: Vec<IdCursor>,
}

impl TermSource {
    pub fn for_word(wi: i32, field_filter: Vec<i32>) -> Self {
        Self {
            word_cursor: Some(IdCursor::new(Table::Term, wi)),
            field_filter,
            field_cursors: Vec::new(),
        }
    }

    pub fn for_fields(lis: Vec<i32>) -> Self {
        Self {
            word_cursor: None,
            field_filter: Vec::new(),
            field_cursors: lis.into_iter().map(|li| IdCursor::new(Table::Field, li)).collect(),
        }
    }

    /// Advances this source to the first doc id `>= min_di`, returning it
    /// (or `None` if the source is exhausted).
    pub fn advance_to(&mut self, index: &mut Index, min_di: i32) -> Result<Option<i32>> {
        if let Some(cursor) = &mut self.word_cursor {
            loop {
                match cursor.peek_di(index)? {
                    Some(d) if d < min_di => {
                        cursor.take_for_doc(index, d)?;
                    }
                    other => return Ok(other),
                }
            }
        }

        loop {
            let mut best: Option<i32> = None;
            for c in &mut self.field_cursors {
                if let Some(d) = c.peek_di(index)? {
                    if d < min_di {
                        continue;
                    }
                    best = Some(best.map_or(d, |b: i32| b.min(d)));
                }
            }
            match best {
                None => {
                    // Either exhausted, or every cursor is still behind
                    // min_di: drain anything below min_di and retry.
                    let mut any_below = false;
                    for c in &mut self.field_cursors {
                        if let Some(d) = c.peek_di(index)? {
                            if d < min_di {
                                c.take_for_doc(index, d)?;
                                any_below = true;
                            }
                        }
                    }
                    if !any_below {
                        return Ok(None);
                    }
                }
                Some(d) => return Ok(Some(d)),
            }
        }
    }

    /// Consumes and returns the sorted, deduplicated positions at `di`
    /// that satisfy this source's field restriction.
    pub fn positions_at(&mut self, index: &mut Index, di: i32) -> Result<Vec<i32>> {
        let mut positions = Vec::new();
        if let Some(cursor) = &mut self.word_cursor {
            for p in cursor.take_for_doc(index, di)? {
                if self.field_filter.is_empty()
                    || p.fields.iter().any(|f| self.field_filter.contains(f))
                {
                    positions.push(p.pi);
                }
            }
        }
        for c in &mut self.field_cursors {
            for p in c.take_for_doc(index, di)? {
                positions.push(p.pi);
            }
        }
        positions.sort_unstable();
        positions.dedup();
        Ok(positions)
    }
}
