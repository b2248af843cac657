//! Error types for ingestion, retrieval and sessions.

use ragbot_embeddings::EmbeddingError;
use ragbot_index::IndexError;
use thiserror::Error;

use crate::generation::GenerationError;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur while ingesting, answering or chatting.
#[derive(Error, Debug)]
pub enum RagError {
    /// The question was empty or whitespace.
    #[error("question is empty")]
    EmptyQuestion,

    /// The data source could not be reached or decoded.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A fetched record has no usable text.
    #[error("malformed record at position {position}: no text in field `{field}`")]
    MalformedRecord { position: usize, field: String },

    /// The index could not answer a query.
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] IndexError),

    /// The generation model failed or answered with nothing.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The session no longer accepts questions.
    #[error("session is closed")]
    SessionClosed,

    /// The index rejected an ingestion batch.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The index and the passage store hold different numbers of entries.
    #[error("index holds {vectors} vectors but {passages} passages are stored")]
    StoreOutOfSync { vectors: usize, passages: usize },

    /// The index returned an id with no stored passage.
    #[error("no passage stored for id {0}")]
    MissingPassage(usize),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
