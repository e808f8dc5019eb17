// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query-socket connection handling (spec.md §4.9 steps 1-4).
//!
//! Each connection runs on its own thread against an [`Index::snapshot`]
//! taken once, up front, under a brief read lock — not the shared
//! `RwLock<Index>` itself. This is the thread::spawn-per-connection
//! replacement for the original's `fork()`-per-connection model: a
//! snapshot gives the connection the same "frozen until you reopen" view
//! a forked child got from its copy-on-write address space, without
//! holding the lock for the query's duration.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::dump::{highlight, matching_positions, read_source};
use crate::engine::Index;
use crate::error::{ArcherError, Result};
use crate::query::{execute, parse, Query, SearchResult};
use crate::server::protocol;

const GREETING: &str = "archer query server ready\n";

/// Per-connection state that the original kept as process globals
/// (`archer_first_hit`/`archer_last_hit`). Scoped to the connection here
/// per spec.md §9's recommendation, since the server is no longer
/// one-process-per-connection.
struct ConnectionState {
    last_results: Vec<SearchResult>,
    hit_first: usize,
    hit_last: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            last_results: Vec::new(),
            hit_first: 0,
            hit_last: 9,
        }
    }

    fn window(&self) -> &[SearchResult] {
        if self.last_results.is_empty() {
            return &[];
        }
        let last = self.hit_last.min(self.last_results.len().saturating_sub(1));
        if self.hit_first > last {
            return &[];
        }
        &self.last_results[self.hit_first..=last]
    }
}

/// Checks a connecting peer's address against the configured allow-list
/// (`"0.0.0.0"` means any peer, mirroring the original's
/// `255.255.255.255` wildcard).
pub fn peer_allowed(allowed: &str, peer: &str) -> bool {
    allowed == "0.0.0.0" || allowed == peer
}

pub fn handle_query_connection(shared: Arc<RwLock<Index>>, stream: TcpStream, peer: String) {
    if let Err(err) = run(shared, stream, peer.clone()) {
        warn!(peer, %err, "query connection ended with an error");
    }
}

fn run(shared: Arc<RwLock<Index>>, stream: TcpStream, peer: String) -> Result<()> {
    let allowed = shared.read().config.allowed_peer.clone();
    if !peer_allowed(&allowed, &peer) {
        return Err(ArcherError::AccessDenied(peer));
    }

    let password_hash = shared.read().config.password_hash.clone();
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    if !password_hash.is_empty() {
        writer.write_all(b"password: ")?;
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if !crate::server::check_password(line.trim_end(), &password_hash) {
            writer.write_all(protocol::error(&ArcherError::Auth).as_bytes())?;
            return Ok(());
        }
    }

    let mut index = {
        let guard = shared.read();
        guard.snapshot()?
    };

    writer.write_all(GREETING.as_bytes())?;
    info!(peer, "query connection established");

    let mut state = ConnectionState::new();
    let mut line = String::new();
    loop {
        writer.write_all(protocol::READY_PROMPT.as_bytes())?;
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        let response = dispatch(&mut index, &mut state, line);
        writer.write_all(response.as_bytes())?;
    }
    Ok(())
}

fn dispatch(index: &mut Index, state: &mut ConnectionState, line: &str) -> String {
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    match cmd {
        "help" => protocol::ok(HELP_TEXT),
        "query" | "nquery" => run_query(index, state, rest),
        "dump" => run_dump(index, state, rest),
        "ndump" => run_dump(index, state, rest),
        "hits" => run_hits(state, rest),
        "docs" => {
            let names = (0..index.docs.table.len())
                .filter(|&i| index.is_live(i as i32))
                .map(|i| index.docs.table.key_of(i).to_string());
            protocol::ok(protocol::doclist(names))
        }
        "fields" => {
            let names = (0..index.fields.table.len()).map(|i| index.fields.table.key_of(i).to_string());
            protocol::ok(protocol::fieldlist(names))
        }
        "rank" => run_rank(index, rest),
        _ => protocol::error(&ArcherError::protocol(format!("unknown command: {cmd}"))),
    }
}

fn run_query(index: &mut Index, state: &mut ConnectionState, text: &str) -> String {
    let query = match parse(text) {
        Ok(q) => q,
        Err(e) => return protocol::error(&e),
    };
    match execute(index, &query) {
        Ok(results) => {
            state.last_results = results;
            let window = state.window();
            let names: Vec<String> = window
                .iter()
                .map(|r| index.doc_path(r.di).unwrap_or("").to_string())
                .collect();
            protocol::ok(protocol::hitlist(window, &names))
        }
        Err(e) => protocol::error(&e),
    }
}

fn run_hits(state: &mut ConnectionState, rest: &str) -> String {
    if rest.trim() == "all" {
        state.hit_first = 0;
        state.hit_last = state.last_results.len().saturating_sub(1);
        return protocol::ok("<ack/>");
    }
    let mut parts = rest.split_whitespace();
    let first = parts.next().and_then(|s| s.parse::<usize>().ok());
    let last = parts.next().and_then(|s| s.parse::<usize>().ok());
    match (first, last) {
        (Some(f), Some(l)) => {
            state.hit_first = f;
            state.hit_last = l;
            protocol::ok("<ack/>")
        }
        _ => protocol::error(&ArcherError::protocol("usage: hits <first> <last> | hits all")),
    }
}

fn run_dump(index: &mut Index, state: &ConnectionState, rest: &str) -> String {
    let mut parts = rest.split_whitespace();
    let di: i32 = match parts.next().and_then(|s| s.parse().ok()) {
        Some(d) => d,
        None => return protocol::error(&ArcherError::protocol("usage: dump <di> [path]")),
    };
    let override_path = parts.next().map(std::path::Path::new);

    let text = match read_source(index, di, override_path) {
        Ok(t) => t,
        Err(e) => return protocol::error(&e),
    };
    let positions: Vec<i32> = state
        .last_results
        .iter()
        .find(|r| r.di == di)
        .map(matching_positions)
        .unwrap_or_default();
    protocol::ok(protocol::dump(highlight(&text, &positions)))
}

fn run_rank(index: &mut Index, rest: &str) -> String {
    let mut parts = rest.splitn(2, ' ');
    let path = match parts.next() {
        Some(p) if !p.is_empty() => p,
        _ => return protocol::error(&ArcherError::protocol("usage: rank <path> <query>")),
    };
    let query_text = parts.next().unwrap_or("");
    let query: Query = match parse(query_text) {
        Ok(q) => q,
        Err(e) => return protocol::error(&e),
    };
    let results = match execute(index, &query) {
        Ok(r) => r,
        Err(e) => return protocol::error(&e),
    };
    let di = index.docs.table.index_of(path).map(|i| i as i32);
    let position = di.and_then(|d| results.iter().position(|r| r.di == d));
    protocol::ok(protocol::rank(position))
}

const HELP_TEXT: &str = "commands: help quit query nquery dump ndump hits docs fields rank";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_allowed_wildcard() {
        assert!(peer_allowed("0.0.0.0", "10.0.0.5"));
        assert!(peer_allowed("10.0.0.5", "10.0.0.5"));
        assert!(!peer_allowed("10.0.0.5", "10.0.0.6"));
    }

    #[test]
    fn connection_state_window_clamps_to_result_count() {
        let mut state = ConnectionState::new();
        state.hit_first = 0;
        state.hit_last = 100;
        state.last_results.push(SearchResult {
            di: 0,
            score: 1.0,
            word_occurrences: Vec::new(),
        });
        assert_eq!(state.window().len(), 1);
    }

    fn corpus() -> (tempfile::TempDir, Index) {
        use crate::indexer::index_document;
        let dir = tempfile::tempdir().unwrap();
        let mut index = Index::create(dir.path()).unwrap();
        index_document(&mut index, "A", "foo bar foo").unwrap();
        index_document(&mut index, "B", "bar baz").unwrap();
        (dir, index)
    }

    #[test]
    fn docs_command_lists_only_live_documents() {
        let (_dir, mut index) = corpus();
        crate::indexer::delete_document(&mut index, "B").unwrap();
        let mut state = ConnectionState::new();
        let response = dispatch(&mut index, &mut state, "docs");
        assert!(response.contains("<document>A</document>"));
        assert!(!response.contains("<document>B</document>"));
    }

    #[test]
    fn query_then_hits_window_then_dump_round_trip() {
        let (_dir, mut index) = corpus();
        let mut state = ConnectionState::new();

        let response = dispatch(&mut index, &mut state, "hits 0 0");
        assert!(response.contains("<ack/>"));

        let response = dispatch(&mut index, &mut state, "query foo");
        assert!(response.contains("<hitlist>"));
        assert!(response.contains("<count>1</count>"));

        let a_di = index.docs.table.index_of("A").unwrap();
        let response = dispatch(&mut index, &mut state, &format!("dump {a_di}"));
        assert!(response.contains("<match>foo</match>"));
    }

    #[test]
    fn rank_reports_not_found_for_unindexed_path() {
        let (_dir, mut index) = corpus();
        let response = run_rank(&mut index, "missing.txt foo");
        assert!(response.contains("not found"));
    }
}
