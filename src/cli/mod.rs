// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the `archer` command-line interface (spec.md §6).
//!
//! One positional argument, the data directory, plus the flags that pick
//! what to do with it: build an index (`--index`/`--index-lines`), run a
//! one-shot query (`--query`), or start the query/admin server
//! (`--query-server`/`--query-forking-server`).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "archer",
    about = "Incremental positional inverted-index and proximity query engine",
    version
)]
pub struct Cli {
    /// Index data directory. Created if it doesn't exist yet.
    pub data_dir: PathBuf,

    /// Recursively index every regular file under this directory.
    #[arg(long, value_name = "DIR")]
    pub index: Option<PathBuf>,

    /// Index each line of this file as a separate document.
    #[arg(long, value_name = "FILE")]
    pub index_lines: Option<PathBuf>,

    /// Run one query against the existing index and print its hit list.
    #[arg(long, value_name = "STR")]
    pub query: Option<String>,

    /// Start the query/admin server pair, serially (one connection at a
    /// time).
    #[arg(long, value_name = "PORT")]
    pub query_server: Option<u16>,

    /// Start the query/admin server pair, one thread per connection.
    #[arg(long, value_name = "PORT")]
    pub query_forking_server: Option<u16>,

    /// Number of hits to print for `--query` (default 10).
    #[arg(long, default_value_t = 10)]
    pub num_hits_to_show: usize,

    /// Print every hit instead of truncating to `--num-hits-to-show`.
    #[arg(long)]
    pub print_all: bool,

    /// Print per-term occurrence/weight breakdown alongside each hit.
    #[arg(long)]
    pub print_word_stats: bool,
}
