//! Offline feature-hashing embeddings.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::{DEFAULT_DIMENSION, Embedding};

const MODEL: &str = "feature-hash-v1";

/// Deterministic embeddings computed locally from word tokens.
///
/// Each lower-cased alphanumeric token is hashed with SHA-256; the digest
/// picks a bucket and a sign. The bucket counts are L2-normalized, so inner
/// product equals cosine similarity and texts sharing words score higher.
/// No network, no model files: suitable for tests and offline use.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Embed `text` synchronously.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }
        vector
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn default_model(&self) -> &str {
        MODEL
    }

    fn default_dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let tokens = request.text.split_whitespace().count() as u64;
        Ok(EmbeddingResponse {
            tokens_used: Some(tokens),
            ..EmbeddingResponse::new(self.embed_text(&request.text), MODEL)
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
