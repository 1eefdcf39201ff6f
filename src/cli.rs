// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// stackguardian - semantic search over Stack Overflow questions
///
/// Builds an exact vector index from a question corpus and answers
/// "find similar questions" queries with a confidence percentage per match.
#[derive(Parser, Debug)]
#[command(name = "stackguardian")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file
    /// (defaults to .stackguardianrc.toml or ~/.config/stackguardian/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the vector index and identifier map from a question corpus
    Build {
        /// Corpus file (JSON Lines or JSON array of {id, title, body})
        #[arg(short, long)]
        corpus: Option<PathBuf>,

        /// Directory to write the artifacts to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find the questions most similar to the given text
    #[command(alias = "s")]
    Search {
        /// Question text
        text: String,

        /// Number of results to return
        #[arg(short = 'k', long, allow_negative_numbers = true)]
        top_k: Option<i64>,
    },

    /// Answer newline-delimited JSON requests on stdin until EOF
    Serve,

    /// Print the welcome message and index statistics
    Info,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_accepts_negative_top_k_for_validation() {
        let cli = Cli::try_parse_from(["stackguardian", "search", "how to", "-k", "-1"]).unwrap();
        match cli.command {
            Commands::Search { text, top_k } => {
                assert_eq!(text, "how to");
                assert_eq!(top_k, Some(-1));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
