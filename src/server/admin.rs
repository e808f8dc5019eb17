// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Admin-socket connection handling (spec.md §4.9 step 5): the only
//! writer against the live index. Each command takes the shared
//! `RwLock<Index>` in write mode for the duration of one indexing call,
//! then releases it — query connections already hold their own
//! snapshot and are unaffected.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::engine::Index;
use crate::error::{ArcherError, Result};
use crate::indexer::index_document;
use crate::server::connection::peer_allowed;
use crate::server::protocol;

const GREETING: &str = "archer admin server ready\n";

pub fn handle_admin_connection(shared: Arc<RwLock<Index>>, stream: TcpStream, peer: String) {
    if let Err(err) = run(shared, stream, peer.clone()) {
        warn!(peer, %err, "admin connection ended with an error");
    }
}

fn run(shared: Arc<RwLock<Index>>, stream: TcpStream, peer: String) -> Result<()> {
    let allowed = shared.read().config.allowed_peer.clone();
    if !peer_allowed(&allowed, &peer) {
        return Err(ArcherError::AccessDenied(peer));
    }

    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    writer.write_all(GREETING.as_bytes())?;
    info!(peer, "admin connection established");

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
        let response = dispatch(&shared, line);
        writer.write_all(response.as_bytes())?;
    }
    Ok(())
}

fn dispatch(shared: &Arc<RwLock<Index>>, line: &str) -> String {
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    match cmd {
        "help" => protocol::ok("commands: help quit index nindex"),
        "index" => run_index(shared, rest.trim(), None),
        "nindex" => {
            let mut parts = rest.trim().splitn(2, ' ');
            let path = parts.next().unwrap_or("");
            let markup_path = parts.next();
            run_index(shared, path, markup_path)
        }
        _ => protocol::error(&ArcherError::protocol(format!("unknown command: {cmd}"))),
    }
}

/// `index <path>` reads `path` directly. `nindex <path> <markup-path>`
/// stores the document under the key `path` but indexes the tagged
/// content of `markup-path` instead — the bow-style split between a
/// document's canonical name and an externally produced markup version
/// of its text (see DESIGN.md for why this reading was chosen).
fn run_index(shared: &Arc<RwLock<Index>>, path: &str, markup_path: Option<&str>) -> String {
    if path.is_empty() {
        return protocol::error(&ArcherError::protocol("usage: index <path> | nindex <path> <markup-path>"));
    }
    let read_path = markup_path.unwrap_or(path);
    let text = match fs::read_to_string(read_path) {
        Ok(t) => t,
        Err(e) => return protocol::error(&ArcherError::Io(e)),
    };
    let mut index = shared.write();

    let archive_dir = index.config.archive_dir.clone();
    let dest = index.data_dir.join(&archive_dir);
    if let Err(e) = index.archive(&dest) {
        return protocol::error(&e);
    }

    match index_document(&mut index, path, &text) {
        Ok(di) => protocol::ok(format!("<indexed><di>{di}</di></indexed>")),
        Err(e) => protocol::error(&e),
    }
}
