// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the index (StringId map, keyed tables, the PV
//! store, the query parser/executor, the server) returns `Result<T>`. The
//! kinds mirror the six-way split used by the server to decide whether a
//! failure is fatal, connection-local, or silent (auth/access denial).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArcherError>;

#[derive(Debug, Error)]
pub enum ArcherError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("query parse error: {0}")]
    Parse(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("authentication failed")]
    Auth,

    #[error("access denied for peer {0}")]
    AccessDenied(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("no such document: {0}")]
    NoSuchDocument(PathBuf),

    #[error("unknown term id: {0}")]
    UnknownId(i32),
}

impl ArcherError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}

/// Asserts an invariant in hot encode/decode loops. In debug builds this
/// panics immediately (matching the teacher's `contracts.rs` style of
/// zero-cost-in-release `debug_assert!`); in release builds the caller is
/// expected to have already converted the same condition into a proper
/// `ArcherError::InvariantViolation` at the point where it can still be
/// propagated as a `Result`.
#[macro_export]
macro_rules! debug_invariant {
    ($cond:expr, $($arg:tt)*) => {
        debug_assert!($cond, $($arg)*);
    };
}
