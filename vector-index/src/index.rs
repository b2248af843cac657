//! The vector index used by ingestion and retrieval.

use tracing::{debug, info};

use crate::error::{IndexError, Result};
use crate::flat::{FlatIndex, NearestNeighbors};
use crate::similarity::Neighbor;

/// An append-only collection of fixed-dimension vectors with top-k search.
///
/// A default-constructed index is *not built*: it has no dimension and
/// rejects `add` and `search`. [`VectorIndex::build`] fixes the dimension
/// from its input and assigns ids `0..n` in order; [`VectorIndex::add`]
/// continues the numbering. Ids are never reused.
///
/// The index does no locking of its own. Callers that ingest and query
/// concurrently must serialize `add` against `search`.
#[derive(Debug, Clone)]
pub struct VectorIndex<B = FlatIndex> {
    backend: Option<B>,
}

impl<B> Default for VectorIndex<B> {
    fn default() -> Self {
        Self { backend: None }
    }
}

impl<B: NearestNeighbors> VectorIndex<B> {
    /// Create an empty, not-yet-built index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new index from `vectors`, inserting them in order.
    ///
    /// Fails on an empty batch, on zero-length vectors and on ragged batches.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = vectors.first().ok_or(IndexError::EmptyInput)?.len();
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }
        check_dimensions(&vectors, dimension)?;

        let count = vectors.len();
        let mut backend = B::with_dimension(dimension);
        backend.insert(vectors);

        info!("Built vector index with {count} vectors of dimension {dimension}");
        Ok(Self {
            backend: Some(backend),
        })
    }

    /// Append `vectors` to a built index.
    ///
    /// The batch is validated as a whole: on a dimension mismatch nothing is
    /// inserted.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        let backend = self.backend.as_mut().ok_or(IndexError::IndexNotBuilt)?;
        check_dimensions(&vectors, backend.dimension())?;

        let first_id = backend.len();
        let count = vectors.len();
        backend.insert(vectors);

        debug!(
            "Added {count} vectors to index (ids {first_id}..{})",
            first_id + count
        );
        Ok(())
    }

    /// Return the `min(k, len)` stored vectors with the highest inner
    /// product against `query`, best first, ties broken by lower id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let backend = match &self.backend {
            Some(backend) if !backend.is_empty() => backend,
            _ => return Err(IndexError::IndexNotBuilt),
        };

        if query.len() != backend.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: backend.dimension(),
                actual: query.len(),
            });
        }

        let results = backend.nearest(query, k);
        debug!("Index search returned {} of k={k} results", results.len());
        Ok(results)
    }

    /// The underlying backend, for diagnostics. `None` until built.
    pub fn get_index(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// Whether `build` has succeeded on this index.
    pub fn is_built(&self) -> bool {
        self.backend.is_some()
    }

    /// The fixed vector length, once built.
    pub fn dimension(&self) -> Option<usize> {
        self.backend.as_ref().map(NearestNeighbors::dimension)
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.backend.as_ref().map_or(0, NearestNeighbors::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_dimensions(vectors: &[Vec<f32>], expected: usize) -> Result<()> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(v) => Err(IndexError::DimensionMismatch {
            expected,
            actual: v.len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn basis() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ]
    }

    fn ids(results: &[Neighbor]) -> Vec<usize> {
        results.iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_build_rejects_empty_input() {
        let err = VectorIndex::<FlatIndex>::build(Vec::new()).unwrap_err();
        assert_eq!(err, IndexError::EmptyInput);
    }

    #[test]
    fn test_build_rejects_ragged_batch() {
        let err = VectorIndex::<FlatIndex>::build(vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert_eq!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_build_rejects_zero_length_vectors() {
        let err = VectorIndex::<FlatIndex>::build(vec![Vec::new(), Vec::new()]).unwrap_err();
        assert_eq!(err, IndexError::ZeroDimension);
    }

    #[test]
    fn test_add_rejects_zero_length_vectors() {
        let mut index = VectorIndex::<FlatIndex>::build(basis()).unwrap();
        let err = index.add(vec![Vec::new()]).unwrap_err();

        assert_eq!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 0
            }
        );
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_add_before_build_fails() {
        let mut index = VectorIndex::<FlatIndex>::new();
        let err = index.add(vec![vec![1.0]]).unwrap_err();
        assert_eq!(err, IndexError::IndexNotBuilt);
        assert!(!index.is_built());
    }

    #[test]
    fn test_search_before_build_fails() {
        let index = VectorIndex::<FlatIndex>::new();
        assert_eq!(
            index.search(&[1.0], 1).unwrap_err(),
            IndexError::IndexNotBuilt
        );
    }

    #[test]
    fn test_add_continues_ids() {
        let mut index = VectorIndex::<FlatIndex>::build(basis()).unwrap();
        index.add(vec![vec![0.0, 0.5, 0.5]]).unwrap();

        assert_eq!(index.len(), 4);
        let results = index.search(&[0.0, 1.0, 1.0], 1).unwrap();
        assert_eq!(ids(&results), vec![3]);
    }

    #[test]
    fn test_add_with_wrong_dimension_inserts_nothing() {
        let mut index = VectorIndex::<FlatIndex>::build(basis()).unwrap();
        let err = index
            .add(vec![vec![1.0, 1.0, 1.0], vec![1.0, 1.0]])
            .unwrap_err();

        assert_eq!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_search_query_dimension_mismatch() {
        let index = VectorIndex::<FlatIndex>::build(basis()).unwrap();
        assert_eq!(
            index.search(&[1.0, 0.0], 1).unwrap_err(),
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_self_similarity_is_top_match() {
        let index = VectorIndex::<FlatIndex>::build(basis()).unwrap();
        let results = index.search(&[0.0, 1.0, 0.0], 1).unwrap();

        assert_eq!(results, vec![Neighbor::new(1, 1.0)]);
    }

    #[test]
    fn test_k_larger_than_count_is_clamped() {
        let index = VectorIndex::<FlatIndex>::build(basis()).unwrap();
        let results = index.search(&[1.0, 1.0, 0.0], 10).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_k_zero_returns_nothing() {
        let index = VectorIndex::<FlatIndex>::build(basis()).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_vectors_rank_by_insertion_order() {
        let index = VectorIndex::<FlatIndex>::build(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 0.0],
        ])
        .unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(ids(&results), vec![1, 2, 3]);
    }

    #[test]
    fn test_get_index_exposes_backend() {
        let index = VectorIndex::<FlatIndex>::build(basis()).unwrap();
        let flat = index.get_index().unwrap();

        assert_eq!(flat.dimension(), 3);
        assert_eq!(flat.vector(2), Some(&[0.0, 0.0, 1.0][..]));
        assert!(VectorIndex::<FlatIndex>::new().get_index().is_none());
    }
}
