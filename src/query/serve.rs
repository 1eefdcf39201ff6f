// SPDX-License-Identifier: MIT OR Apache-2.0

//! `serve` command - newline-delimited JSON requests on stdin
//!
//! Each input line is one request:
//!
//! ```text
//! {"op": "find_similar_questions", "text": "...", "top_k": 5}
//! {"op": "info"}
//! ```
//!
//! Each request gets exactly one JSON line back. A bad request yields an
//! `{"error": .., "kind": ..}` line and the loop keeps going.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};

use stackguardian::config::Config;
use stackguardian::{
    FindSimilarRequest, FindSimilarResponse, InfoResponse, QueryService, SearchContext,
};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ServeRequest {
    FindSimilarQuestions(FindSimilarRequest),
    Info,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ServeResponse {
    Results(FindSimilarResponse),
    Info(InfoResponse),
    Error { error: String, kind: &'static str },
}

/// Counters reported when the input stream ends
#[derive(Debug, Default, PartialEq, Eq)]
struct ServeStats {
    answered: usize,
    failed: usize,
}

/// Run the serve command
pub fn run(config: &Config) -> Result<()> {
    let context = SearchContext::load(config).context("Failed to start search service")?;
    let service = QueryService::from(context);
    tracing::info!("serving requests on stdin");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let stats = serve(&service, stdin.lock(), stdout.lock())?;
    tracing::info!(
        "input closed after {} answered and {} failed requests",
        stats.answered,
        stats.failed
    );
    Ok(())
}

fn serve<R: BufRead, W: Write>(
    service: &QueryService,
    reader: R,
    mut writer: W,
) -> Result<ServeStats> {
    let mut stats = ServeStats::default();

    for line in reader.lines() {
        let line = line.context("Failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = answer(service, &line);
        if matches!(response, ServeResponse::Error { .. }) {
            stats.failed += 1;
        } else {
            stats.answered += 1;
        }

        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }

    Ok(stats)
}

fn answer(service: &QueryService, line: &str) -> ServeResponse {
    let request: ServeRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!("malformed request: {}", err);
            return ServeResponse::Error {
                error: err.to_string(),
                kind: "request",
            };
        }
    };

    match request {
        ServeRequest::Info => ServeResponse::Info(service.welcome()),
        ServeRequest::FindSimilarQuestions(request) => match service.handle(&request) {
            Ok(response) => ServeResponse::Results(response),
            Err(err) => {
                tracing::warn!("request failed: {}", err);
                ServeResponse::Error {
                    error: err.to_string(),
                    kind: err.kind(),
                }
            }
        },
    }
}
