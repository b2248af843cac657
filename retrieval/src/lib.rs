//! # Retrieval-Augmented Chat
//!
//! This crate wires ragbot together:
//!
//! - **Ingestion**: fetch records, embed them, grow the vector index
//! - **Retrieval**: embed a question, rank passages by inner product
//! - **Generation**: answer from the ranked passages
//! - **Sessions**: keep the question/answer history of a conversation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Retrieval-Augmented Chat                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  DataSource ──► IngestionPipeline ──► SharedIndex + Passages    │
//! │                        │                       │                │
//! │               EmbeddingProvider                │                │
//! │                        │                       ▼                │
//! │  Session::ask ──► RagEngine::generate ──► Generator             │
//! │        │                                                        │
//! │        ▼                                                        │
//! │  ChainOfThought                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragbot_retrieval::{HttpSource, IngestionPipeline, RagEngine, Session, shared_store};
//!
//! let (index, passages) = shared_store();
//! IngestionPipeline::new(Arc::new(HttpSource::new(url)), embedder.clone(), index.clone(), passages.clone())
//!     .run()
//!     .await?;
//!
//! let mut session = Session::new(RagEngine::new(index, passages, embedder, generator));
//! let answer = session.ask("What is this site about?").await?;
//! ```

use std::sync::Arc;

use ragbot_index::VectorIndex;
use tokio::sync::RwLock;

pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod passage;
pub mod session;
pub mod source;

pub use config::{
    EmbeddingConfig, EmbeddingProviderType, GenerationConfig, GeneratorType, QueryConfig,
    RagConfig, SourceConfig,
};
pub use engine::{RagEngine, RetrievedPassage};
pub use error::{RagError, Result};
pub use generation::{ExtractiveGenerator, GenerationError, Generator, OpenAIGenerator};
pub use ingest::IngestionPipeline;
pub use passage::{Passage, PassageStore};
pub use session::{ChainOfThought, Session, SessionState, Turn};
pub use source::{DataSource, HttpSource, Record, StaticSource};

// Re-export from dependencies for convenience
pub use ragbot_embeddings::{EmbeddingProvider, HashingProvider, OpenAIProvider};
pub use ragbot_index::{IndexError, Neighbor};

/// The index shared by the ingestion (write) and retrieval (read) paths.
pub type SharedIndex = Arc<RwLock<VectorIndex>>;

/// Passage text, kept in step with [`SharedIndex`] ids.
///
/// Writers lock the index before the passages; readers do the same.
pub type SharedPassages = Arc<RwLock<PassageStore>>;

/// A fresh, unbuilt index and an empty passage store.
pub fn shared_store() -> (SharedIndex, SharedPassages) {
    (
        Arc::new(RwLock::new(VectorIndex::new())),
        Arc::new(RwLock::new(PassageStore::new())),
    )
}
