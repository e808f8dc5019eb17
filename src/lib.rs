// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! An incremental, positional, field-aware inverted index and Boolean/
//! proximity query engine.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌────────────┐   ┌────────────┐
//! │ stringid  │──▶│keyed_table│──▶│   engine   │──▶│  indexer   │
//! │(vocabulary│   │(doc/field │   │ (Index:    │   │(drives the │
//! │  interning│   │  tables)  │   │  top-level │   │  lexer,    │
//! │  )        │   │           │   │  handle)   │   │  writes    │
//! └───────────┘   └───────────┘   └─────┬──────┘   │  postings) │
//!                                        │          └────────────┘
//!                        ┌───────────────┼───────────────┐
//!                        ▼               ▼               ▼
//!                  ┌───────────┐   ┌───────────┐   ┌───────────┐
//!                  │term_index │   │    pv     │   │   query   │
//!                  │(wi/li →   │──▶│ (segmented│   │(parser,   │
//!                  │   Pv)     │   │  posting  │   │ executor, │
//!                  │           │   │  store)   │   │ AST)      │
//!                  └───────────┘   └───────────┘   └───────────┘
//! ```
//!
//! `server` and `dump` sit on top of `query` and `engine` to expose the
//! line-oriented socket protocol in spec.md §6.

pub mod config;
pub mod dump;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod keyed_table;
pub mod lexer;
pub mod pv;
pub mod query;
pub mod server;
pub mod stringid;
pub mod term_index;
