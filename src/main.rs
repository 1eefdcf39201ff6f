// SPDX-License-Identifier: MIT OR Apache-2.0

//! stackguardian - semantic search over Stack Overflow questions
//!
//! `build` runs the offline index pipeline; `search`, `serve` and `info`
//! load the persisted index once and answer queries against it.

mod cli;
mod indexer;
mod query;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use stackguardian::config::Config;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize tracing with STACKGUARDIAN_LOG env var
    // (e.g., STACKGUARDIAN_LOG=debug stackguardian search "query")
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STACKGUARDIAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "stackguardian", &mut std::io::stdout());
        return Ok(());
    }

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_file(path)?,
        None => Config::load(),
    };

    match cli.command {
        Commands::Build { corpus, output } => {
            indexer::build::run(&config, corpus.as_deref(), output.as_deref(), format)?;
        }
        Commands::Search { text, top_k } => {
            query::search::run(&config, &text, top_k, format)?;
        }
        Commands::Serve => {
            query::serve::run(&config)?;
        }
        Commands::Info => {
            query::info::run(&config, format)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
