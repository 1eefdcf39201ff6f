// SPDX-License-Identifier: MIT OR Apache-2.0

//! stackguardian - semantic question search library
//!
//! Offline: a corpus of questions is embedded into an exact vector index plus
//! an identifier map. Online: a query is embedded, its nearest neighbors are
//! looked up, and each raw distance is mapped to a confidence percentage.

pub mod builder;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod errors;
pub mod index;
pub mod output;
pub mod scoring;
pub mod service;

pub use builder::{BuildReport, IndexBuilder};
pub use errors::{ArtifactError, BuildError, IndexError, QueryError, StartupError, ValidationError};
pub use scoring::{score, ConfidenceZones, Zone};
pub use service::{
    FindSimilarRequest, FindSimilarResponse, InfoResponse, QueryService, SearchContext,
    SimilarQuestion, WELCOME_MESSAGE,
};
