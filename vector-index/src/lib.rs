//! # Vector Index
//!
//! An in-memory, append-only similarity index over fixed-dimension
//! embeddings. Vectors are identified by their insertion position and
//! ranked by inner product.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Vector Index                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  build / add ──► VectorIndex ──► search ──► Vec<Neighbor>       │
//! │                       │                                         │
//! │                       ▼                                         │
//! │              NearestNeighbors (FlatIndex)                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use ragbot_index::VectorIndex;
//!
//! let mut index: VectorIndex = VectorIndex::build(vec![vec![1.0, 0.0], vec![0.0, 1.0]])?;
//! index.add(vec![vec![0.6, 0.8]])?;
//!
//! let top = index.search(&[0.0, 1.0], 2)?;
//! assert_eq!(top[0].id, 1);
//! # Ok::<(), ragbot_index::IndexError>(())
//! ```

pub mod error;
pub mod flat;
pub mod index;
pub mod similarity;

pub use error::{IndexError, Result};
pub use flat::{FlatIndex, NearestNeighbors};
pub use index::VectorIndex;
pub use similarity::{Neighbor, cosine_similarity, dot_product, normalize};
