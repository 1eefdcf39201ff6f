// SPDX-License-Identifier: MIT OR Apache-2.0

//! `search` command - one find_similar_questions request from the command line

use anyhow::{Context, Result};
use colored::Colorize;

use crate::cli::OutputFormat;
use stackguardian::config::Config;
use stackguardian::output::{
    colorize_distance, colorize_id, colorize_link, colorize_percent, use_colors,
};
use stackguardian::{FindSimilarRequest, QueryService, SearchContext};

/// Run the search command
pub fn run(config: &Config, text: &str, top_k: Option<i64>, format: OutputFormat) -> Result<()> {
    let request = match top_k {
        Some(top_k) => FindSimilarRequest::new(text, top_k),
        None => FindSimilarRequest::with_default_top_k(text),
    };

    // Reject bad input before loading anything.
    request.validate(config.search().default_top_k())?;

    let context = SearchContext::load(config).context("Failed to start search service")?;
    let zones = context.zones();
    let service = QueryService::from(context);
    let response = service.handle(&request)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            let use_color = use_colors();
            if response.results.is_empty() {
                if use_color {
                    println!("{} No results found for: {}", "✗".red(), text.yellow());
                } else {
                    println!("No results found for: {}", text);
                }
                return Ok(());
            }

            if use_color {
                println!(
                    "\n{} Found {} similar questions for: {}\n",
                    "✓".green(),
                    response.results.len().to_string().cyan(),
                    text.yellow()
                );
            } else {
                println!(
                    "\nFound {} similar questions for: {}\n",
                    response.results.len(),
                    text
                );
            }

            for (rank, result) in response.results.iter().enumerate() {
                let zone = zones.zone(f64::from(result.distance));
                println!(
                    "{:>3}. {} {} {}  {}",
                    rank + 1,
                    colorize_percent(result.similarity_percent, zone, use_color),
                    colorize_id(&result.identifier, use_color),
                    colorize_distance(result.distance, use_color),
                    colorize_link(&result.link, use_color)
                );
            }
        }
    }

    Ok(())
}
