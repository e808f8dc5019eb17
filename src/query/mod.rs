// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query AST, parser, and executor (spec.md §4.7, §4.8).

pub mod ast;
pub mod executor;
pub mod parser;
mod source;

pub use ast::{ProximityLink, ProximityPosition, Query, TermNode};
pub use executor::{execute, SearchResult, WordOccurrence};
pub use parser::parse;
