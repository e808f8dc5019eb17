// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query/admin server (spec.md §4.9, §5): two TCP listeners behind one
//! shared index, with per-connection lifecycle.
//!
//! The original forks a child process per connection and relies on the
//! child reopening the PV blob to get an independent `lseek` offset.
//! `fork()` has no safe equivalent here (this crate forbids `unsafe`), so
//! each connection instead gets its own [`Index::snapshot`] — a clone of
//! the in-memory cursors plus freshly opened file handles, taken under a
//! brief read lock. `config.forking` now selects between handling
//! connections on their own `thread::spawn`'d thread (concurrent, like
//! the original's forking mode) or one at a time on the accept thread
//! (serial, like its non-forking mode) — see SPEC_FULL.md Design Notes.

pub mod admin;
pub mod connection;
pub mod protocol;

use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::engine::Index;
use crate::error::Result;

pub fn sha256_hex(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Replaces crypt(3) password verification (see DESIGN.md): the
/// configured hash is a SHA-256 hex digest, compared against the hash of
/// the line the client sent.
pub fn check_password(candidate: &str, expected_hash: &str) -> bool {
    sha256_hex(candidate) == expected_hash
}

/// Binds the query socket on `port` and the admin socket on `port + 1`,
/// then runs the accept loop until the process is killed. Blocks the
/// calling thread.
pub fn serve(index: Index, query_port: u16) -> Result<()> {
    let forking = index.config.forking;
    let shared = Arc::new(RwLock::new(index));
    let admin_port = query_port + 1;

    let query_listener = TcpListener::bind(("0.0.0.0", query_port))?;
    let admin_listener = TcpListener::bind(("0.0.0.0", admin_port))?;
    info!(query_port, admin_port, forking, "archer server listening");

    let admin_shared = Arc::clone(&shared);
    let admin_thread = thread::spawn(move || {
        for conn in admin_listener.incoming() {
            match conn {
                Ok(stream) => {
                    let peer = stream
                        .peer_addr()
                        .map(|a| a.ip().to_string())
                        .unwrap_or_default();
                    admin::handle_admin_connection(Arc::clone(&admin_shared), stream, peer);
                }
                Err(err) => error!(%err, "admin accept failed"),
            }
        }
    });

    for conn in query_listener.incoming() {
        let stream = match conn {
            Ok(s) => s,
            Err(err) => {
                error!(%err, "query accept failed");
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map(|a| a.ip().to_string())
            .unwrap_or_default();
        let shared = Arc::clone(&shared);
        if forking {
            thread::spawn(move || connection::handle_query_connection(shared, stream, peer));
        } else {
            connection::handle_query_connection(shared, stream, peer);
        }
    }

    let _ = admin_thread.join();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trips() {
        let hash = sha256_hex("hunter2");
        assert!(check_password("hunter2", &hash));
        assert!(!check_password("wrong", &hash));
    }
}
