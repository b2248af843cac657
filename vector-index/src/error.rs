//! Error types for the vector index.

use thiserror::Error;

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while building, growing or searching an index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// A vector's length differs from the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `build` was called with no vectors.
    #[error("cannot build an index from zero vectors")]
    EmptyInput,

    /// Vectors must have at least one component.
    #[error("vectors must have at least one dimension")]
    ZeroDimension,

    /// The index has not been built, or holds no vectors yet.
    #[error("index is not built")]
    IndexNotBuilt,
}
