// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for stackguardian
//!
//! Loads configuration from .stackguardianrc.toml in current directory or
//! ~/.config/stackguardian/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::errors::StartupError;
use crate::index::ArtifactPaths;
use crate::scoring::ConfidenceZones;

/// Name of the per-directory configuration file
pub const CONFIG_FILE: &str = ".stackguardianrc.toml";

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    #[default]
    Builtin,
    Command,
    Hash,
}

/// Corpus configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Path to the question corpus (JSON Lines or JSON array)
    pub path: Option<PathBuf>,
}

impl CorpusConfig {
    /// Get corpus path (defaults to data/processed/questions.jsonl)
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from("data/processed/questions.jsonl"))
    }
}

/// Artifact locations
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory holding the vector index and identifier map
    pub dir: Option<PathBuf>,
    /// File name of the vector index
    pub index_file: Option<String>,
    /// File name of the identifier map
    pub id_map_file: Option<String>,
}

impl ArtifactConfig {
    /// Get artifact directory (defaults to "models")
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| PathBuf::from("models"))
    }

    /// Get index file name (defaults to "vector_index.bin")
    pub fn index_file(&self) -> &str {
        self.index_file.as_deref().unwrap_or("vector_index.bin")
    }

    /// Get identifier map file name (defaults to "id_map.json")
    pub fn id_map_file(&self) -> &str {
        self.id_map_file.as_deref().unwrap_or("id_map.json")
    }

    /// Artifact paths inside `dir`
    pub fn paths_in(&self, dir: impl AsRef<Path>) -> ArtifactPaths {
        ArtifactPaths::in_dir(dir, self.index_file(), self.id_map_file())
    }

    /// Artifact paths inside the configured directory
    pub fn paths(&self) -> ArtifactPaths {
        self.paths_in(self.dir())
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type (builtin, command, hash)
    pub provider: Option<EmbeddingProviderType>,
    /// Model identifier for the command provider
    pub model: Option<String>,
    /// Command to execute for command provider
    pub command: Option<String>,
    /// Vector dimension for the hash provider
    pub dimension: Option<usize>,
}

impl EmbeddingConfig {
    /// Get provider type (defaults to Builtin)
    pub fn provider(&self) -> EmbeddingProviderType {
        self.provider.unwrap_or_default()
    }

    /// Get model identifier (defaults to "all-MiniLM-L6-v2")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("all-MiniLM-L6-v2")
    }

    /// Get command (defaults to "embedder")
    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or("embedder")
    }

    /// Get hash provider dimension (defaults to 384)
    pub fn dimension(&self) -> usize {
        self.dimension
            .unwrap_or(crate::embedding::DEFAULT_EMBEDDING_DIM)
    }
}

/// Search configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results when a request does not say
    pub default_top_k: Option<usize>,
    /// Link template; `{id}` is replaced by the question identifier
    pub link_template: Option<String>,
}

impl SearchConfig {
    /// Get default top k (defaults to 5)
    pub fn default_top_k(&self) -> usize {
        self.default_top_k.unwrap_or(crate::service::DEFAULT_TOP_K)
    }

    /// Get link template (defaults to the Stack Overflow short link)
    pub fn link_template(&self) -> &str {
        self.link_template
            .as_deref()
            .unwrap_or("https://stackoverflow.com/q/{id}")
    }
}

/// Confidence zone thresholds
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Distances at or below this are high-confidence matches
    pub high_distance: Option<f64>,
    /// Distances below this (and above high) are medium-confidence matches
    pub medium_distance: Option<f64>,
    /// Width of the low zone before scores floor out
    pub low_span: Option<f64>,
}

impl ScoringConfig {
    /// Validated confidence zones
    pub fn zones(&self) -> Result<ConfidenceZones, StartupError> {
        let defaults = ConfidenceZones::DEFAULT;
        ConfidenceZones::new(
            self.high_distance.unwrap_or(defaults.high),
            self.medium_distance.unwrap_or(defaults.medium),
            self.low_span.unwrap_or(defaults.low_span),
        )
    }
}

/// Configuration loaded from .stackguardianrc.toml or ~/.config/stackguardian/config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Corpus configuration
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Artifact configuration
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Scoring configuration
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .stackguardianrc.toml in current directory
    /// 2. ~/.config/stackguardian/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(Path::new(CONFIG_FILE)) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home
                .join(".config")
                .join("stackguardian")
                .join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Load an explicitly named configuration file. Unlike discovery, a
    /// missing or malformed file is an error.
    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get the corpus configuration
    pub fn corpus(&self) -> &CorpusConfig {
        &self.corpus
    }

    /// Get the artifact configuration
    pub fn artifacts(&self) -> &ArtifactConfig {
        &self.artifacts
    }

    /// Get the embedding configuration
    pub fn embeddings(&self) -> &EmbeddingConfig {
        &self.embeddings
    }

    /// Get the search configuration
    pub fn search(&self) -> &SearchConfig {
        &self.search
    }

    /// Get the scoring configuration
    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }
}
