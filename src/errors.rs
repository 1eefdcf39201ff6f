// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by the index, builder and query service.
//!
//! Library code returns these typed errors; the CLI wraps them in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the in-memory vector index and identifier map.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid vector: {0}")]
    InvalidVector(String),

    #[error("position {position} out of range for identifier map of length {len}")]
    OutOfRange { position: usize, len: usize },

    #[error("vector index dimension must be greater than zero")]
    ZeroDimension,
}

/// Errors raised while reading or writing persisted index artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a vector index file (bad magic)", path.display())]
    BadMagic { path: PathBuf },

    #[error("{} uses unsupported format version {version}", path.display())]
    UnsupportedVersion { path: PathBuf, version: u32 },

    #[error("{} is truncated: expected {expected} bytes, found {actual}", path.display())]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("{} failed checksum verification", path.display())]
    ChecksumMismatch { path: PathBuf },

    #[error("failed to parse identifier map {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("identifier map holds {ids} ids but vector index holds {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    #[error("identifier map was built for a different vector index")]
    IndexChecksumMismatch,

    #[error("identifier map records dimension {id_map}, vector index has {index}")]
    DimensionMismatch { id_map: usize, index: usize },

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Fatal errors of the offline index build. No artifacts are left behind.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("corpus file not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    #[error("output directory {} is not writable: {source}", path.display())]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read corpus {}: {source}", path.display())]
    CorpusRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed corpus record at line {line}: {source}")]
    CorpusParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("corpus has no rows with both a title and a body")]
    EmptyCorpus,

    #[error("embedding provider failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("embedding provider returned {actual} vectors for {expected} inputs")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Fatal errors while bringing up the query context.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("embedding provider unavailable: {0:#}")]
    Provider(anyhow::Error),

    #[error("invalid scoring thresholds: {0}")]
    InvalidScoring(String),

    #[error("search.default_top_k must be at least 1")]
    InvalidDefaultTopK,

    #[error("embedding provider yields dimension {actual}, index holds dimension {expected}")]
    ProviderDimension { expected: usize, actual: usize },

    #[error("index was built with '{built_with}' but the provider is '{configured}'; rebuild it")]
    ModelMismatch {
        built_with: String,
        configured: String,
    },
}

/// Request rejected at the boundary before touching the query service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query text must not be empty")]
    EmptyText,

    #[error("top_k must be at least 1, got {0}")]
    InvalidTopK(i64),
}

/// Per-request failure. Never affects shared state.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("failed to embed query: {0:#}")]
    Embedding(anyhow::Error),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl QueryError {
    /// Short machine-readable category used in JSON error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Invalid(_) => "validation",
            QueryError::Embedding(_) => "embedding",
            QueryError::Index(_) => "index",
        }
    }
}
