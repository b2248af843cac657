//! Nearest-neighbor backends.
//!
//! [`VectorIndex`](crate::VectorIndex) owns the build/add/search contract and
//! its validation; a backend only stores vectors and answers `nearest`. The
//! exact [`FlatIndex`] is the only backend today. An approximate structure
//! can be dropped in by implementing [`NearestNeighbors`].

use crate::similarity::{Neighbor, rank_top_k};

/// Storage and top-k lookup over fixed-dimension vectors.
///
/// Ids are positions in insertion order. Implementations may assume every
/// vector they receive has already been checked against `dimension()`.
pub trait NearestNeighbors {
    /// Create an empty backend for vectors of length `dimension`.
    fn with_dimension(dimension: usize) -> Self
    where
        Self: Sized;

    /// Length of every stored vector.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors; each receives the next sequential id.
    fn insert(&mut self, vectors: Vec<Vec<f32>>);

    /// The `min(k, len)` most similar vectors, best first, ties by lower id.
    fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor>;

    /// The stored vector with the given id.
    fn vector(&self, id: usize) -> Option<&[f32]>;
}

/// Exact brute-force inner-product index.
///
/// Vectors are kept in one contiguous row-major buffer, so a search is a
/// single linear pass over `len * dimension` floats.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Iterate stored vectors in id order.
    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension.max(1))
    }
}

impl NearestNeighbors for FlatIndex {
    fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn insert(&mut self, vectors: Vec<Vec<f32>>) {
        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(&vector);
        }
    }

    fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let scored = self
            .iter()
            .enumerate()
            .map(|(id, stored)| {
                let score = stored.iter().zip(query).map(|(x, y)| x * y).sum();
                Neighbor::new(id, score)
            })
            .collect();

        rank_top_k(scored, k)
    }

    fn vector(&self, id: usize) -> Option<&[f32]> {
        let start = id.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.data.get(start..end)
    }
}
