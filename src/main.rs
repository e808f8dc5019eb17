// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! `archer` CLI: build, query, and serve an incremental positional
//! inverted index (spec.md §6).
//!
//! ```bash
//! # Index every file under ./docs into ./search-index
//! archer ./search-index --index ./docs
//!
//! # Run a one-shot query
//! archer ./search-index --query "+title:rust proximity"
//!
//! # Serve queries on port 8420, admin on the next port up
//! archer ./search-index --query-server 8420
//! ```

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use archer::engine::Index;
use archer::indexer::{index_directory, index_lines};
use archer::query::{execute, parse};
use archer::server;

use cli::Cli;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "archer exited with an error");
            eprintln!("archer: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> archer::error::Result<()> {
    let mut index = if cli.data_dir.exists() {
        Index::open(&cli.data_dir)?
    } else {
        Index::create(&cli.data_dir)?
    };

    if let Some(dir) = &cli.index {
        let count = index_directory(&mut index, dir)?;
        index.flush()?;
        info!(count, dir = %dir.display(), "indexed directory");
    }

    if let Some(file) = &cli.index_lines {
        let count = index_lines(&mut index, file)?;
        index.flush()?;
        info!(count, file = %file.display(), "indexed lines");
    }

    if let Some(query_text) = &cli.query {
        run_query(&mut index, query_text, &cli)?;
    }

    if let Some(port) = cli.query_forking_server {
        index.config.forking = true;
        server::serve(index, port)?;
    } else if let Some(port) = cli.query_server {
        index.config.forking = false;
        server::serve(index, port)?;
    }

    Ok(())
}

fn run_query(index: &mut Index, query_text: &str, cli: &Cli) -> archer::error::Result<()> {
    let query = parse(query_text)?;
    let results = execute(index, &query)?;

    let shown = if cli.print_all {
        results.len()
    } else {
        cli.num_hits_to_show.min(results.len())
    };

    println!("{} hit(s), showing {}", results.len(), shown);
    for result in &results[..shown] {
        let name = index.doc_path(result.di).unwrap_or("<unknown>");
        println!("{:>8.4}  {}", result.score, name);
        if cli.print_word_stats {
            for occ in &result.word_occurrences {
                println!(
                    "          {} x{} contribution={:.4}",
                    occ.term,
                    occ.positions.len(),
                    occ.contribution
                );
            }
        }
    }

    Ok(())
}
