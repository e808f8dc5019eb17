// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query AST (spec.md §4.7): terms with optional field restriction,
//! weights, and proximity chains, grouped into inclusion/exclusion/
//! ranking lists.
//!
//! The original links proximity constraints through raw pointers; here a
//! chain is a flat `Vec<ProximityLink>` (SPEC_FULL.md Design Notes: owned
//! arenas in place of pointer graphs).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityPosition {
    Before,
    After,
    Within,
}

#[derive(Debug, Clone)]
pub struct ProximityLink {
    pub position: ProximityPosition,
    pub distance: u32,
    pub term: TermNode,
}

/// One atom of a query: either a bare word, a field-only probe (`field:`
/// with no word), or both (`field:word`).
#[derive(Debug, Clone)]
pub struct TermNode {
    pub word: Option<String>,
    pub fields: Vec<String>,
    pub weight: f32,
    pub proximity: Vec<ProximityLink>,
}

impl TermNode {
    pub fn word(word: impl Into<String>) -> Self {
        Self {
            word: Some(word.into()),
            fields: Vec::new(),
            weight: 1.0,
            proximity: Vec::new(),
        }
    }

    pub fn field_only(field: impl Into<String>) -> Self {
        Self {
            word: None,
            fields: vec![field.into()],
            weight: 1.0,
            proximity: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn followed_by(mut self, position: ProximityPosition, distance: u32, term: TermNode) -> Self {
        self.proximity.push(ProximityLink {
            position,
            distance,
            term,
        });
        self
    }

    /// All terms in this node's proximity chain, head first.
    pub fn chain(&self) -> Vec<&TermNode> {
        let mut out = vec![self];
        let mut cur = self;
        while let Some(link) = cur.proximity.first() {
            out.push(&link.term);
            cur = &link.term;
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub inclusion: Vec<TermNode>,
    pub exclusion: Vec<TermNode>,
    pub ranking: Vec<TermNode>,
    /// When set (used by `dump`/`rank`), the executor only considers this
    /// document id during the doc-advance step (spec.md §4.8 edge cases).
    pub restrict_to: Option<i32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }
}
