//! # Embeddings
//!
//! This crate turns text into dense vectors for ragbot's ingestion and
//! retrieval paths.
//!
//! ## Features
//!
//! - **Provider Trait**: [`EmbeddingProvider`] is the injected collaborator
//! - **OpenAI**: Any OpenAI-compatible `/embeddings` endpoint
//! - **Offline**: Deterministic feature hashing with no model download
//! - **Caching**: Repeated texts are answered from memory
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingRequest ──► EmbeddingProvider ──► EmbeddingResponse   │
//! │                             │                                   │
//! │              ┌──────────────┼──────────────┐                    │
//! │              ▼              ▼              ▼                    │
//! │       OpenAIProvider  HashingProvider  CachedProvider           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod hashing;
pub mod provider;

pub use cache::{CacheStats, CachedProvider, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use hashing::HashingProvider;
pub use provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, OpenAIProvider};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Default width for locally computed embeddings (matches MiniLM-L6).
pub const DEFAULT_DIMENSION: usize = 384;
