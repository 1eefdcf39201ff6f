// SPDX-License-Identifier: MIT OR Apache-2.0

//! Question corpus loading and cleaning.
//!
//! A corpus is either JSON Lines (one question per line) or a single JSON
//! array. Each record carries an id, a title and a body; the original dump
//! column names (`Id`, `Title`, `Body`) are accepted as well.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::errors::BuildError;

/// Question identifier as it appears in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    pub fn into_string(self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// One corpus record before cleaning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorpusRow {
    #[serde(default, alias = "Id")]
    pub id: Option<RawId>,
    #[serde(default, alias = "Title")]
    pub title: Option<String>,
    #[serde(default, alias = "Body")]
    pub body: Option<String>,
}

impl CorpusRow {
    /// Convert into an embedding input, or `None` when a required field is missing.
    pub fn into_entry(self) -> Option<CorpusEntry> {
        let id = self.id?.into_string();
        let title = self.title?;
        let body = self.body?;
        Some(CorpusEntry {
            id,
            text: format!("{}. {}", title, body),
        })
    }
}

/// A cleaned corpus item ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub id: String,
    pub text: String,
}

impl CorpusEntry {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Result of cleaning a corpus.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Surviving entries in original row order
    pub entries: Vec<CorpusEntry>,
    /// Total rows read
    pub rows_read: usize,
    /// Rows dropped for missing fields
    pub rows_dropped: usize,
}

/// Read and clean a corpus file.
pub fn load_corpus(path: &Path) -> Result<Corpus, BuildError> {
    let content = fs::read_to_string(path).map_err(|source| BuildError::CorpusRead {
        path: path.to_path_buf(),
        source,
    })?;

    let rows = if is_json_array(path, &content) {
        serde_json::from_str::<Vec<CorpusRow>>(&content)
            .map_err(|source| BuildError::CorpusParse {
                line: source.line(),
                source,
            })?
    } else {
        parse_json_lines(&content)?
    };

    Ok(clean_rows(rows))
}

/// Drop rows missing a required field, preserving the order of the rest.
pub fn clean_rows(rows: Vec<CorpusRow>) -> Corpus {
    let rows_read = rows.len();
    let mut entries = Vec::with_capacity(rows_read);

    for (row_number, row) in rows.into_iter().enumerate() {
        match row.into_entry() {
            Some(entry) => entries.push(entry),
            None => tracing::warn!(
                "dropping corpus row {}: missing id, title or body",
                row_number + 1
            ),
        }
    }

    Corpus {
        rows_dropped: rows_read - entries.len(),
        rows_read,
        entries,
    }
}

fn parse_json_lines(content: &str) -> Result<Vec<CorpusRow>, BuildError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| BuildError::CorpusParse {
                line: i + 1,
                source,
            })
        })
        .collect()
}

fn is_json_array(path: &Path, content: &str) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jsonl") | Some("ndjson") => false,
        Some("json") => true,
        _ => content.trim_start().starts_with('['),
    }
}
