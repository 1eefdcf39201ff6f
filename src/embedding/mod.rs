// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - turns question text into fixed-dimension vectors.
//!
//! The encoder itself is a black box behind [`EmbeddingProvider`]; the index
//! builder and the query service only rely on one vector per input, in order.

pub mod hash;
pub mod provider;

pub use hash::HashEmbedder;
#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
pub use provider::{EmbeddingProviderConfig, FastEmbedder};
pub use provider::{create_provider, CommandProvider, EmbeddingProvider};

/// Embedding dimension of sentence-transformers/all-MiniLM-L6-v2.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
