// SPDX-License-Identifier: MIT OR Apache-2.0

//! Online query service.
//!
//! [`SearchContext`] is built once at startup and never mutated afterwards;
//! [`QueryService`] shares it behind an `Arc` so any number of callers can
//! query concurrently. The only lock guards the embedding provider, whose
//! inference session needs exclusive access.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::errors::{ArtifactError, QueryError, StartupError, ValidationError};
use crate::index::{load_artifacts, FlatIndex, IdentifierMap};
use crate::scoring::ConfidenceZones;

/// Static liveness/info message.
pub const WELCOME_MESSAGE: &str = "Welcome to the StackGuardian AI search service. \
     Send a find_similar_questions request to search.";

/// Result count used when neither the request nor the configuration names one.
pub const DEFAULT_TOP_K: usize = 5;

/// Embedded once at startup to confirm the provider answers with the index's dimension.
const STARTUP_CHECK_TEXT: &str = "How do I merge two dictionaries in Python?";

/// A `find_similar_questions` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindSimilarRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
}

impl FindSimilarRequest {
    pub fn new(text: impl Into<String>, top_k: i64) -> Self {
        Self {
            text: text.into(),
            top_k: Some(top_k),
        }
    }

    /// A request that takes whatever result count the service defaults to.
    pub fn with_default_top_k(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: None,
        }
    }

    /// Check the request and return the result count, falling back to
    /// `default_top_k` when the request names none.
    pub fn validate(&self, default_top_k: usize) -> Result<usize, ValidationError> {
        let top_k = self
            .top_k
            .unwrap_or_else(|| i64::try_from(default_top_k).unwrap_or(i64::MAX));
        validate(&self.text, top_k)
    }
}

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarQuestion {
    pub identifier: String,
    pub distance: f32,
    pub similarity_percent: f64,
    pub link: String,
}

/// Response to a `find_similar_questions` request, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindSimilarResponse {
    pub results: Vec<SimilarQuestion>,
}

/// Response to the info operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub message: String,
}

/// Everything a query needs, loaded once and then frozen.
pub struct SearchContext {
    provider: Mutex<Box<dyn EmbeddingProvider>>,
    model_id: String,
    index: FlatIndex,
    ids: IdentifierMap,
    zones: ConfidenceZones,
    link_template: String,
    default_top_k: usize,
}

impl SearchContext {
    /// Assemble a context.
    ///
    /// Refuses an identifier map that does not line up with the index, and
    /// embeds one text to make sure the provider works and produces vectors of
    /// the index's dimension.
    pub fn new(
        mut provider: Box<dyn EmbeddingProvider>,
        index: FlatIndex,
        ids: IdentifierMap,
        zones: ConfidenceZones,
        link_template: impl Into<String>,
    ) -> Result<Self, StartupError> {
        if ids.len() != index.len() {
            return Err(ArtifactError::LengthMismatch {
                ids: ids.len(),
                vectors: index.len(),
            }
            .into());
        }

        let vector = provider
            .embed_one(STARTUP_CHECK_TEXT)
            .map_err(StartupError::Provider)?;
        if vector.len() != index.dimension() {
            return Err(StartupError::ProviderDimension {
                expected: index.dimension(),
                actual: vector.len(),
            });
        }

        Ok(Self {
            model_id: provider.model_id().to_string(),
            provider: Mutex::new(provider),
            index,
            ids,
            zones,
            link_template: link_template.into(),
            default_top_k: DEFAULT_TOP_K,
        })
    }

    /// Result count for requests that do not name one.
    pub fn with_default_top_k(mut self, default_top_k: usize) -> Self {
        self.default_top_k = default_top_k;
        self
    }

    /// Load artifacts and the embedding provider described by `config`.
    ///
    /// Artifacts are checked before the (slow) model load. The provider must be
    /// the model the index was built with.
    pub fn load(config: &Config) -> Result<Self, StartupError> {
        let zones = config.scoring().zones()?;
        let default_top_k = config.search().default_top_k();
        if default_top_k == 0 {
            return Err(StartupError::InvalidDefaultTopK);
        }

        let paths = config.artifacts().paths();
        tracing::info!("loading vector index from {}", paths.index.display());
        tracing::info!("loading identifier map from {}", paths.id_map.display());
        let artifacts = load_artifacts(&paths)?;

        tracing::info!("loading embedding provider {:?}", config.embeddings().provider());
        let provider = create_provider(config.embeddings()).map_err(StartupError::Provider)?;
        if provider.model_id() != artifacts.model_id {
            return Err(StartupError::ModelMismatch {
                built_with: artifacts.model_id,
                configured: provider.model_id().to_string(),
            });
        }

        let context = Self::new(
            provider,
            artifacts.index,
            artifacts.ids,
            zones,
            config.search().link_template(),
        )?
        .with_default_top_k(default_top_k);
        tracing::info!(
            "search context ready: {} vectors of dimension {} from {}",
            context.index.len(),
            context.index.dimension(),
            context.model_id
        );
        Ok(context)
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn ids(&self) -> &IdentifierMap {
        &self.ids
    }

    pub fn zones(&self) -> ConfidenceZones {
        self.zones
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Link for a question identifier.
    pub fn link_for(&self, identifier: &str) -> String {
        self.link_template.replace("{id}", identifier)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, QueryError> {
        self.provider
            .lock()
            .embed_one(text)
            .map_err(QueryError::Embedding)
    }
}

/// Cheaply clonable handle answering similarity queries.
#[derive(Clone)]
pub struct QueryService {
    context: Arc<SearchContext>,
}

impl QueryService {
    pub fn new(context: Arc<SearchContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    /// Return the `top_k` stored questions closest to `text`, best first.
    ///
    /// Fewer results come back when the index holds fewer than `top_k` vectors.
    pub fn find_similar(
        &self,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<SimilarQuestion>, QueryError> {
        let top_k_signed = i64::try_from(top_k).unwrap_or(i64::MAX);
        validate(text, top_k_signed)?;

        let ctx = &self.context;
        let query = ctx.embed_query(text)?;
        let neighbors = ctx.index.search(&query, top_k)?;
        tracing::debug!(
            "query matched {} of {} requested neighbors",
            neighbors.len(),
            top_k
        );

        neighbors
            .into_iter()
            .map(|neighbor| -> Result<SimilarQuestion, QueryError> {
                let identifier = ctx.ids.resolve(neighbor.position)?.to_string();
                Ok(SimilarQuestion {
                    link: ctx.link_for(&identifier),
                    similarity_percent: ctx.zones.score(f64::from(neighbor.distance)),
                    distance: neighbor.distance,
                    identifier,
                })
            })
            .collect()
    }

    /// Validate a request at the boundary and answer it.
    pub fn handle(&self, request: &FindSimilarRequest) -> Result<FindSimilarResponse, QueryError> {
        let top_k = request.validate(self.context.default_top_k)?;
        let results = self.find_similar(&request.text, top_k)?;
        Ok(FindSimilarResponse { results })
    }

    /// Liveness/info operation.
    pub fn welcome(&self) -> InfoResponse {
        InfoResponse {
            message: WELCOME_MESSAGE.to_string(),
        }
    }
}

impl From<SearchContext> for QueryService {
    fn from(context: SearchContext) -> Self {
        Self::new(Arc::new(context))
    }
}

fn validate(text: &str, top_k: i64) -> Result<usize, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if top_k < 1 {
        return Err(ValidationError::InvalidTopK(top_k));
    }
    usize::try_from(top_k).map_err(|_| ValidationError::InvalidTopK(top_k))
}
