// SPDX-License-Identifier: MIT OR Apache-2.0

//! `info` command - welcome message plus artifact statistics

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use stackguardian::config::Config;
use stackguardian::index::read_index_header;
use stackguardian::WELCOME_MESSAGE;

#[derive(Debug, Serialize)]
struct InfoOutput {
    message: &'static str,
    index_path: PathBuf,
    id_map_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    vectors: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimension: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_error: Option<String>,
}

/// Run the info command
pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let paths = config.artifacts().paths();

    let mut output = InfoOutput {
        message: WELCOME_MESSAGE,
        index_path: paths.index.clone(),
        id_map_path: paths.id_map.clone(),
        vectors: None,
        dimension: None,
        index_error: None,
    };

    if paths.index.exists() {
        match read_index_header(&paths.index) {
            Ok(header) => {
                output.vectors = Some(header.count);
                output.dimension = Some(header.dimension);
            }
            Err(err) => output.index_error = Some(err.to_string()),
        }
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("{}", output.message);
            println!("  index:  {}", output.index_path.display());
            println!("  id map: {}", output.id_map_path.display());
            match (output.vectors, output.dimension, &output.index_error) {
                (Some(vectors), Some(dimension), _) => {
                    println!("  {} vectors of dimension {}", vectors, dimension);
                }
                (_, _, Some(err)) => println!("  {} {}", "✗".red(), err),
                _ => println!("  no index built yet; run `stackguardian build`"),
            }
        }
    }

    Ok(())
}
