// SPDX-License-Identifier: MIT OR Apache-2.0

//! `build` command - embed the corpus and persist the search artifacts

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cli::OutputFormat;
use stackguardian::builder::preflight;
use stackguardian::config::Config;
use stackguardian::embedding::create_provider;
use stackguardian::IndexBuilder;

/// Build summary for JSON output
#[derive(Debug, Serialize)]
struct BuildSummary {
    rows_read: usize,
    rows_dropped: usize,
    vectors: usize,
    dimension: usize,
    model: String,
    index_path: PathBuf,
    id_map_path: PathBuf,
    elapsed_ms: u128,
}

/// Run the build command
pub fn run(
    config: &Config,
    corpus: Option<&Path>,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let corpus_path = corpus
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.corpus().path());
    let paths = match output {
        Some(dir) => config.artifacts().paths_in(dir),
        None => config.artifacts().paths(),
    };

    // Surface a missing corpus or unwritable output before paying for a model load.
    preflight(&corpus_path, &paths)?;

    let start = Instant::now();
    let mut provider =
        create_provider(config.embeddings()).context("Failed to initialize embedding provider")?;
    let report = IndexBuilder::new(provider.as_mut())
        .with_progress(format == OutputFormat::Text)
        .build(&corpus_path, &paths)
        .context("Index build failed")?;
    let elapsed = start.elapsed();

    match format {
        OutputFormat::Json => {
            let summary = BuildSummary {
                rows_read: report.rows_read,
                rows_dropped: report.rows_dropped,
                vectors: report.vectors,
                dimension: report.dimension,
                model: report.model_id,
                index_path: report.index_path,
                id_map_path: report.id_map_path,
                elapsed_ms: elapsed.as_millis(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            if report.rows_dropped > 0 {
                println!(
                    "{} Indexed {} questions ({} dropped for missing fields, {} read)",
                    "✓".green(),
                    report.vectors.to_string().cyan(),
                    report.rows_dropped.to_string().dimmed(),
                    report.rows_read
                );
            } else {
                println!("{} Indexed {} questions", "✓".green(), report.vectors);
            }
            println!(
                "  dimension {} | model {} | {:.1}s",
                report.dimension,
                report.model_id,
                elapsed.as_secs_f64()
            );
            println!("  index:  {}", report.index_path.display());
            println!("  id map: {}", report.id_map_path.display());
        }
    }

    Ok(())
}
