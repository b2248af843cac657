//! Embedding cache for repeated texts.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};

#[derive(Debug, Clone)]
struct CacheEntry {
    embedding: Embedding,
    model: String,
    /// Insertion sequence number, used to evict the oldest entry.
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

/// Bounded in-memory cache of embeddings keyed by (model, text).
pub struct EmbeddingCache {
    inner: RwLock<CacheInner>,
    max_entries: usize,
}

impl EmbeddingCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            max_entries,
        }
    }

    fn hash_key(text: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Get an embedding from the cache.
    pub async fn get(&self, text: &str, model: &str) -> Option<Embedding> {
        let key = Self::hash_key(text, model);
        let mut inner = self.inner.write().await;
        let found = inner.entries.get(&key).map(|e| e.embedding.clone());
        if found.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        found
    }

    /// Put an embedding in the cache, evicting the oldest entry when full.
    pub async fn put(&self, text: &str, model: &str, embedding: Embedding) {
        if self.max_entries == 0 {
            return;
        }

        let key = Self::hash_key(text, model);
        let mut inner = self.inner.write().await;

        if inner.entries.len() >= self.max_entries && !inner.entries.contains_key(&key) {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, v)| v.seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            CacheEntry {
                embedding,
                model: model.to_string(),
                seq,
            },
        );
    }

    /// Clear the entire cache.
    pub async fn clear(&self) {
        self.inner.write().await.entries.clear();
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        let mut models: Vec<String> = inner.entries.values().map(|e| e.model.clone()).collect();
        models.sort();
        models.dedup();

        CacheStats {
            entries: inner.entries.len(),
            max_entries: self.max_entries,
            hits: inner.hits,
            misses: inner.misses,
            models,
        }
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Models with cached embeddings.
    pub models: Vec<String>,
}

/// A provider wrapper that answers repeated texts from an [`EmbeddingCache`].
pub struct CachedProvider<P> {
    provider: P,
    cache: EmbeddingCache,
}

impl<P: EmbeddingProvider> CachedProvider<P> {
    pub fn new(provider: P, cache: EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    fn model_for(&self, request: &EmbeddingRequest) -> String {
        request
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn default_model(&self) -> &str {
        self.provider.default_model()
    }

    fn default_dimension(&self) -> usize {
        self.provider.default_dimension()
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = self.model_for(&request);

        if let Some(embedding) = self.cache.get(&request.text, &model).await {
            debug!("Cache hit for embedding");
            return Ok(EmbeddingResponse::new(embedding, model));
        }

        let text = request.text.clone();
        let response = self.provider.embed(request).await?;
        self.cache
            .put(&text, &model, response.embedding.clone())
            .await;

        Ok(response)
    }

    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        let mut slots: Vec<Option<EmbeddingResponse>> = Vec::with_capacity(requests.len());
        let mut misses = Vec::new();
        let mut miss_slots = Vec::new();

        for request in requests {
            let model = self.model_for(&request);
            match self.cache.get(&request.text, &model).await {
                Some(embedding) => slots.push(Some(EmbeddingResponse::new(embedding, model))),
                None => {
                    miss_slots.push(slots.len());
                    slots.push(None);
                    misses.push(request);
                }
            }
        }

        if !misses.is_empty() {
            let keys: Vec<(String, String)> = misses
                .iter()
                .map(|r| (r.text.clone(), self.model_for(r)))
                .collect();
            let fresh = self.provider.embed_batch(misses).await?;
            if fresh.len() != keys.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    keys.len(),
                    fresh.len()
                )));
            }

            for ((slot, (text, model)), response) in miss_slots.into_iter().zip(keys).zip(fresh) {
                self.cache
                    .put(&text, &model, response.embedding.clone())
                    .await;
                slots[slot] = Some(response);
            }
        }

        debug!("Embedded batch of {} with cache", slots.len());
        Ok(slots.into_iter().flatten().collect())
    }

    fn is_available(&self) -> bool {
        self.provider.is_available()
    }
}
