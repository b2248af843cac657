//! Similarity computation and ranking.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Compute the inner product of two vectors.
///
/// This is the ranking score used by the index. Callers that want cosine
/// similarity should [`normalize`] both sides first.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(IndexError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Compute the cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot = dot_product(a, b)?;
    let magnitude_a = magnitude(a);
    let magnitude_b = magnitude(b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (magnitude_a * magnitude_b))
}

/// Euclidean length of a vector.
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize a vector to unit length in place. Zero vectors are left as is.
pub fn normalize(v: &mut [f32]) {
    let magnitude = magnitude(v);
    if magnitude > 0.0 {
        for x in v.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// One entry of a query result: the stored vector's id and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Insertion-order id of the stored vector.
    pub id: usize,

    /// Inner-product similarity with the query.
    pub score: f32,
}

impl Neighbor {
    pub fn new(id: usize, score: f32) -> Self {
        Self { id, score }
    }
}

/// Keep the `k` best of `scored`, ordered by descending score and then by
/// ascending id.
pub fn rank_top_k(mut scored: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    scored.sort_by_key(|n| (Reverse(OrderedFloat(n.score)), n.id));
    scored.truncate(k);
    scored
}
