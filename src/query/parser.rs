// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query string parser (spec.md §4.7): space-separated terms, quoted
//! phrases, `+required`/`-excluded`, and `field:term` restriction.
//!
//! Terms with no `+`/`-` prefix land in the *ranking* group — scored but
//! not required — which is what makes a bare `query foo` degrade to "find
//! and rank every document containing foo" rather than "foo is a hard
//! requirement AND also gets ranked" (the two read identically for a
//! single-term query, but diverge once a query mixes bare and `+` terms).
//! `+`/`-` move a term into the inclusion/exclusion group instead. This
//! convention isn't specified by spec.md (the original's yacc grammar
//! wasn't in the source pack) — see DESIGN.md for the full rationale.

use crate::error::{ArcherError, Result};
use crate::query::ast::{ProximityPosition, Query, TermNode};

/// Parses a query string into a [`Query`] AST.
pub fn parse(input: &str) -> Result<Query> {
    let mut query = Query::new();
    for raw_token in tokenize(input) {
        let (group, body) = split_prefix(&raw_token);
        let node = parse_term(body)?;
        match group {
            Group::Inclusion => query.inclusion.push(node),
            Group::Exclusion => query.exclusion.push(node),
            Group::Ranking => query.ranking.push(node),
        }
    }
    Ok(query)
}

enum Group {
    Inclusion,
    Exclusion,
    Ranking,
}

fn split_prefix(token: &str) -> (Group, &str) {
    match token.as_bytes().first() {
        Some(b'+') => (Group::Inclusion, &token[1..]),
        Some(b'-') => (Group::Exclusion, &token[1..]),
        _ => (Group::Ranking, token),
    }
}

/// Splits `input` on whitespace, keeping `"quoted phrases"` together as
/// one token (including their surrounding `+`/`-`, e.g. `+"foo bar"`).
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut current = String::new();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if c == '"' {
            in_quotes = !in_quotes;
            current.push(c);
            continue;
        }
        if c.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_term(body: &str) -> Result<TermNode> {
    let (field, rest) = split_field(body);

    if rest.starts_with('"') {
        let phrase = rest.trim_matches('"');
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.is_empty() {
            return Err(ArcherError::parse("empty quoted phrase"));
        }
        return Ok(build_phrase_chain(&words, field));
    }

    if rest.is_empty() {
        let field = field.ok_or_else(|| ArcherError::parse("empty query term"))?;
        return Ok(TermNode::field_only(field));
    }

    let mut node = TermNode::word(rest);
    if let Some(f) = field {
        node = node.with_field(f);
    }
    Ok(node)
}

fn split_field(body: &str) -> (Option<&str>, &str) {
    if let Some(idx) = body.find(':') {
        let (field, rest) = body.split_at(idx);
        if !field.is_empty() && field.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return (Some(field), &rest[1..]);
        }
    }
    (None, body)
}

/// Builds a right-leaning `Before(1)` chain so adjacent words in the
/// phrase must appear at strictly consecutive positions (spec.md §4.7).
fn build_phrase_chain(words: &[&str], field: Option<&str>) -> TermNode {
    let mut node = TermNode::word(words[words.len() - 1]);
    if let Some(f) = field {
        node = node.clone().with_field(f);
    }
    for w in words[..words.len() - 1].iter().rev() {
        let mut head = TermNode::word(*w);
        if let Some(f) = field {
            head = head.with_field(f);
        }
        node = head.followed_by(ProximityPosition::Before, 1, node);
    }
    node
}
