// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query executor (spec.md §4.8): the doc-at-a-time merge, proximity
//! verification, inclusion/exclusion/ranking bookkeeping, and tf·idf
//! scoring that turn a [`Query`] into ranked [`SearchResult`]s.
//!
//! Grounded on `archer_query_execute.c`'s `next_term_di`/`search_recursive`
//! / `search`/`search_restrict` shape, re-expressed without the raw
//! `bow_array` tables: the "intersection table" `T` from spec.md §4.8 is a
//! `HashMap<i32, Vec<WordOccurrence>>`, and proximity chains are walked
//! with an explicit recursive function over owned `Vec<i32>` position
//! lists instead of pointer-linked `bow_array`s.

use std::collections::{HashMap, HashSet};

use crate::engine::Index;
use crate::error::Result;
use crate::query::ast::{ProximityLink, ProximityPosition, Query, TermNode};
use crate::query::source::TermSource;

/// One term's contribution to a single document's score: which id it was
/// (a vocabulary term or a field probe), which positions it matched at,
/// and the tf·idf contribution those positions are worth.
#[derive(Debug, Clone)]
pub struct WordOccurrence {
    pub id: i32,
    pub is_field: bool,
    pub term: String,
    pub positions: Vec<i32>,
    pub contribution: f64,
}

/// A document's matched positions for one term, before the term's final
/// `idf` is known. Kept separate from [`WordOccurrence`] so every
/// document gets the same `idf` for a term regardless of the order in
/// which documents were discovered during the scan.
#[derive(Debug, Clone)]
struct RawOccurrence {
    id: i32,
    is_field: bool,
    term: String,
    positions: Vec<i32>,
    weight: f64,
}

type RawTable = HashMap<i32, Vec<RawOccurrence>>;

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub di: i32,
    pub score: f64,
    pub word_occurrences: Vec<WordOccurrence>,
}

type Table = HashMap<i32, Vec<WordOccurrence>>;

/// Resolves a [`TermNode`] chain into executor-ready [`TermSource`]s plus
/// a display label per node (for [`WordOccurrence::term`]) and whether
/// each node is a dead end (unknown vocabulary word: spec.md §4.8 "a term
/// whose word is unknown... yields no postings").
fn build_sources(index: &Index, chain: &[&TermNode]) -> (Vec<TermSource>, Vec<(i32, bool, String)>) {
    let mut sources = Vec::with_capacity(chain.len());
    let mut meta = Vec::with_capacity(chain.len());
    for node in chain {
        match &node.word {
            Some(word) => {
                let wi = index.vocab.lookup(word);
                let field_ids: Vec<i32> = node
                    .fields
                    .iter()
                    .filter_map(|f| index.fields.table.index_of(f).map(|i| i as i32))
                    .collect();
                sources.push(TermSource::for_word(wi, field_ids));
                meta.push((wi, false, word.clone()));
            }
            None => {
                let field_ids: Vec<i32> = node
                    .fields
                    .iter()
                    .filter_map(|f| index.fields.table.index_of(f).map(|i| i as i32))
                    .collect();
                let label = node.fields.join(",");
                let display_id = field_ids.first().copied().unwrap_or(-1);
                sources.push(TermSource::for_fields(field_ids));
                meta.push((display_id, true, label));
            }
        }
    }
    (sources, meta)
}

/// Recursively verifies the proximity chain starting at `node_idx`
/// sitting at `pi`, recording (into `matched`) every position of every
/// node that participates in at least one fully-satisfying chain.
/// Mirrors `search_recursive` in `archer_query_execute.c`.
fn walk_chain(
    node_idx: usize,
    pi: i32,
    positions: &[Vec<i32>],
    links: &[&[ProximityLink]],
    matched: &mut [HashSet<i32>],
) -> bool {
    if node_idx + 1 == positions.len() {
        matched[node_idx].insert(pi);
        return true;
    }
    let link = links[node_idx]
        .first()
        .expect("chain has a next node but no link describing how to reach it");
    let mut any = false;
    for &next_pi in &positions[node_idx + 1] {
        let satisfies = match link.position {
            ProximityPosition::Before => next_pi > pi && next_pi - pi <= link.distance as i32,
            ProximityPosition::After => pi > next_pi && pi - next_pi <= link.distance as i32,
            ProximityPosition::Within => (pi - next_pi).unsigned_abs() <= link.distance,
        };
        if satisfies && walk_chain(node_idx + 1, next_pi, positions, links, matched) {
            any = true;
        }
    }
    if any {
        matched[node_idx].insert(pi);
    }
    any
}

fn chain_links<'a>(chain_head: &'a TermNode) -> (Vec<&'a TermNode>, Vec<&'a [ProximityLink]>) {
    let nodes = chain_head.chain();
    let mut links = Vec::with_capacity(nodes.len());
    for node in &nodes {
        links.push(node.proximity.as_slice());
    }
    (nodes, links)
}

/// Scans the whole index (or just `restrict_to`, per spec.md §4.8's
/// "dump" doc-restriction edge case) for documents where `term`'s
/// proximity chain matches, gating acceptance into the result table by
/// `shortlist`/`exclude`. `df` is only known once the whole scan
/// finishes, so occurrences are collected without a score first; the
/// caller (`search_term`) memoizes one `idf` for the term and applies it
/// to every document's occurrences afterward, mirroring
/// `calculate_tfidf`'s single memoized idf per term in
/// `archer_query_execute.c` rather than baking in a running, per-document
/// `idf` at discovery time.
fn scan_term(
    index: &mut Index,
    term: &TermNode,
    shortlist: Option<(&HashSet<i32>, bool)>,
    restrict_to: Option<i32>,
) -> Result<(RawTable, u64)> {
    let (chain, links) = chain_links(term);
    let (mut sources, meta) = build_sources(index, &chain);

    let mut table: RawTable = HashMap::new();
    let mut df: u64 = 0;

    let mut after = -1i32;
    loop {
        let mut target = after + 1;
        if let Some(r) = restrict_to {
            target = target.max(r);
        }

        // k-way doc-at-a-time merge: repeatedly advance every source to
        // `target` until they all land on the same doc id.
        let candidate = loop {
            let mut max_di: Option<i32> = None;
            for s in &mut sources {
                match s.advance_to(index, target)? {
                    None => return Ok((table, df)),
                    Some(d) => max_di = Some(max_di.map_or(d, |m: i32| m.max(d))),
                }
            }
            let max_di = max_di.unwrap();
            if max_di == target {
                break max_di;
            }
            target = max_di;
        };

        if let Some(r) = restrict_to {
            if candidate > r {
                return Ok((table, df));
            }
        }

        let positions: Vec<Vec<i32>> = {
            let mut out = Vec::with_capacity(sources.len());
            for s in &mut sources {
                out.push(s.positions_at(index, candidate)?);
            }
            out
        };

        after = candidate;

        if positions.iter().any(Vec::is_empty) {
            continue;
        }

        let mut matched: Vec<HashSet<i32>> = vec![HashSet::new(); chain.len()];
        let mut any_match = false;
        for &pi in &positions[0] {
            if walk_chain(0, pi, &positions, &links, &mut matched) {
                any_match = true;
            }
        }
        if !any_match || !index.is_live(candidate) {
            continue;
        }
        df += 1;

        let accept = match shortlist {
            None => true,
            Some((set, false)) => set.contains(&candidate),
            Some((set, true)) => !set.contains(&candidate),
        };
        if !accept {
            continue;
        }

        let entry = table.entry(candidate).or_default();
        for (i, pis) in matched.iter().enumerate() {
            if pis.is_empty() {
                continue;
            }
            let mut positions: Vec<i32> = pis.iter().copied().collect();
            positions.sort_unstable();
            let (id, is_field, label) = meta[i].clone();
            entry.push(RawOccurrence {
                id,
                is_field,
                term: label,
                positions,
                weight: chain[i].weight as f64,
            });
        }
    }
}

/// Runs [`scan_term`] to completion, then applies one memoized `idf` —
/// computed from the scan's final `df` — to every document's occurrences.
fn search_term(
    index: &mut Index,
    term: &TermNode,
    shortlist: Option<(&HashSet<i32>, bool)>,
    restrict_to: Option<i32>,
) -> Result<(Table, u64)> {
    let (raw, df) = scan_term(index, term, shortlist, restrict_to)?;
    let live_doc_count = index.live_doc_count().max(1) as f64;
    let idf = if df == 0 {
        0.0
    } else {
        (live_doc_count / df as f64).ln().max(0.0)
    };

    let table: Table = raw
        .into_iter()
        .map(|(di, occs)| {
            let occs = occs
                .into_iter()
                .map(|o| WordOccurrence {
                    id: o.id,
                    is_field: o.is_field,
                    term: o.term,
                    contribution: o.positions.len() as f64 * o.weight * idf,
                    positions: o.positions,
                })
                .collect();
            (di, occs)
        })
        .collect();
    Ok((table, df))
}

fn merge_sorted(occurrences: &mut [WordOccurrence]) {
    occurrences.sort_by(|a, b| a.id.cmp(&b.id).then(a.is_field.cmp(&b.is_field)));
}

/// Executes `query` against `index` and returns documents ranked by
/// descending score (spec.md §4.8 steps 1-6).
pub fn execute(index: &mut Index, query: &Query) -> Result<Vec<SearchResult>> {
    let mut occ_acc: Table = HashMap::new();
    let mut restrict: Option<HashSet<i32>> = None;
    let mut exclude_blacklist: HashSet<i32> = HashSet::new();
    let mut exclude_mode = false;

    for term in &query.inclusion {
        let shortlist = restrict.as_ref().map(|s| (s, false));
        let (matches, _df) = search_term(index, term, shortlist, query.restrict_to)?;
        match &restrict {
            Some(existing) => {
                let kept: HashSet<i32> = existing
                    .iter()
                    .copied()
                    .filter(|di| matches.contains_key(di))
                    .collect();
                occ_acc.retain(|di, _| kept.contains(di));
                for (di, occs) in matches {
                    if kept.contains(&di) {
                        occ_acc.entry(di).or_default().extend(occs);
                    }
                }
                restrict = Some(kept);
            }
            None => {
                restrict = Some(matches.keys().copied().collect());
                occ_acc = matches;
            }
        }
    }

    for term in &query.exclusion {
        match &restrict {
            Some(existing) => {
                let shortlist = Some((existing, false));
                let (matches, _df) = search_term(index, term, shortlist, query.restrict_to)?;
                let kept: HashSet<i32> = existing
                    .iter()
                    .copied()
                    .filter(|di| !matches.contains_key(di))
                    .collect();
                occ_acc.retain(|di, _| kept.contains(di));
                restrict = Some(kept);
            }
            None => {
                let (matches, _df) = search_term(index, term, None, query.restrict_to)?;
                exclude_blacklist.extend(matches.into_keys());
                exclude_mode = true;
            }
        }
    }

    if !query.ranking.is_empty() {
        let shortlist = if exclude_mode {
            Some((&exclude_blacklist, true))
        } else {
            restrict.as_ref().map(|s| (s, false))
        };
        for term in &query.ranking {
            let (matches, _df) = search_term(index, term, shortlist, query.restrict_to)?;
            for (di, occs) in matches {
                occ_acc.entry(di).or_default().extend(occs);
            }
        }
    } else if exclude_mode {
        // Exclusion-only query (spec.md §4.8): defined to yield nothing.
        occ_acc.clear();
    }

    let mut results: Vec<SearchResult> = occ_acc
        .into_iter()
        .map(|(di, mut occs)| {
            merge_sorted(&mut occs);
            let score = occs.iter().map(|o| o.contribution).sum();
            SearchResult {
                di,
                score,
                word_occurrences: occs,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.di.cmp(&b.di))
    });
    Ok(results)
}
