// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Server/indexer configuration.
//!
//! CLI flags cover the common case (see [`crate::cli`]); an optional
//! `archer.toml` next to the data directory covers settings that are
//! awkward as flags (peer allow-list, password hash, fork mode, the
//! per-position field-count bound). Flags always override the file.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Accept connections only from this peer; "0.0.0.0" (the default)
    /// means any peer. Mirrors the original's "255.255.255.255 means any".
    pub allowed_peer: String,
    /// SHA-256 hex digest of the required password, or empty to disable
    /// the password gate. See DESIGN.md for why this replaces crypt(3).
    pub password_hash: String,
    /// Spawn one worker thread per connection instead of serving serially.
    /// The teacher's `fork()`-per-connection model becomes `thread::spawn`
    /// per connection; see SPEC_FULL.md Design Notes.
    pub forking: bool,
    /// Upper bound on the number of field ids attached to a single
    /// position (replaces the original's fixed `li[100]` array).
    pub max_fields_per_position: usize,
    /// Directory (relative to the data directory, unless absolute) that
    /// admin `index`/`nindex` commands archive the index into before
    /// writing, mirroring `barrel.c`'s backup-before-rebuild convention.
    pub archive_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_peer: "0.0.0.0".to_string(),
            password_hash: String::new(),
            forking: false,
            max_fields_per_position: 100,
            archive_dir: "archive".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("archer.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        let cfg: Self = toml::from_str(&text)
            .map_err(|e| crate::error::ArcherError::protocol(format!("archer.toml: {e}")))?;
        Ok(cfg)
    }
}
