//! The read path: question in, grounded answer out.

use std::sync::Arc;

use ragbot_embeddings::{EmbeddingProvider, EmbeddingRequest};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::QueryConfig;
use crate::error::{RagError, Result};
use crate::generation::{GenerationError, Generator};
use crate::{SharedIndex, SharedPassages};

/// A passage selected for a question, with its rank score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub id: usize,
    pub score: f32,
    pub text: String,
}

/// Retrieval-augmented generation over a shared index.
///
/// Each call embeds the question, takes the `top_k` most similar passages
/// from the index and hands them, best first, to the [`Generator`]. The
/// engine only reads the index.
pub struct RagEngine {
    index: SharedIndex,
    passages: SharedPassages,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
    config: QueryConfig,
    model: Option<String>,
}

impl RagEngine {
    pub fn new(
        index: SharedIndex,
        passages: SharedPassages,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            index,
            passages,
            embedder,
            generator,
            config: QueryConfig::default(),
            model: None,
        }
    }

    /// Set the query configuration.
    pub fn with_query_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Request a specific embedding model. Must match the one used for
    /// ingestion.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn top_k(&self) -> usize {
        self.config.top_k
    }

    /// Rank stored passages against `question`.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedPassage>> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let mut request = EmbeddingRequest::new(question);
        if let Some(model) = &self.model {
            request = request.with_model(model);
        }
        let embedding = self.embedder.embed(request).await?.embedding;

        // Lock order: index, then passages.
        let index = self.index.read().await;
        let hits = index
            .search(&embedding, self.config.top_k)
            .map_err(RagError::Retrieval)?;

        let store = self.passages.read().await;
        let retrieved = hits
            .into_iter()
            .map(|hit| -> Result<RetrievedPassage> {
                let text = store.text(hit.id).ok_or(RagError::MissingPassage(hit.id))?;
                Ok(RetrievedPassage {
                    id: hit.id,
                    score: hit.score,
                    text: text.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Retrieved passages {:?} for question",
            retrieved.iter().map(|p| p.id).collect::<Vec<_>>()
        );
        Ok(retrieved)
    }

    /// Answer `question` from the passages most similar to it.
    pub async fn generate(&self, question: &str) -> Result<String> {
        let retrieved = self.retrieve(question).await?;
        let passages: Vec<String> = retrieved.into_iter().map(|p| p.text).collect();

        let answer = self.generator.generate(question, &passages).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(GenerationError::EmptyAnswer.into());
        }

        debug!(
            "Generator {} answered with {} chars",
            self.generator.name(),
            answer.len()
        );
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ExtractiveGenerator;
    use crate::passage::Passage;
    use crate::shared_store;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use ragbot_embeddings::HashingProvider;
    use ragbot_index::{IndexError, VectorIndex};

    const DIM: usize = 512;

    struct SilentGenerator;

    #[async_trait]
    impl Generator for SilentGenerator {
        fn name(&self) -> &str {
            "silent"
        }

        async fn generate(
            &self,
            _question: &str,
            _passages: &[String],
        ) -> std::result::Result<String, GenerationError> {
            Ok("  \n".to_string())
        }
    }

    async fn engine_with(texts: &[&str], generator: Arc<dyn Generator>) -> RagEngine {
        let embedder = HashingProvider::new(DIM);
        let (index, passages) = shared_store();

        if !texts.is_empty() {
            let vectors = texts.iter().map(|t| embedder.embed_text(t)).collect();
            *index.write().await = VectorIndex::build(vectors).unwrap();
            passages
                .write()
                .await
                .extend(texts.iter().map(|t| Passage::new(*t)));
        }

        RagEngine::new(index, passages, Arc::new(embedder), generator)
    }

    fn corpus() -> Vec<&'static str> {
        vec![
            "the borrow checker enforces ownership",
            "sourdough needs a long fermentation",
            "tokio schedules async tasks",
        ]
    }

    #[tokio::test]
    async fn test_empty_question() {
        let engine = engine_with(&corpus(), Arc::new(ExtractiveGenerator)).await;
        let err = engine.generate(" \t ").await.unwrap_err();
        assert!(matches!(err, RagError::EmptyQuestion));
    }

    #[tokio::test]
    async fn test_unbuilt_index_is_retrieval_error() {
        let engine = engine_with(&[], Arc::new(ExtractiveGenerator)).await;
        let err = engine.generate("anything").await.unwrap_err();
        assert!(matches!(
            err,
            RagError::Retrieval(IndexError::IndexNotBuilt)
        ));
    }

    #[tokio::test]
    async fn test_retrieve_ranks_matching_passage_first() {
        let engine = engine_with(&corpus(), Arc::new(ExtractiveGenerator)).await;
        let retrieved = engine
            .retrieve("sourdough needs a long fermentation")
            .await
            .unwrap();

        assert_eq!(retrieved.len(), 3);
        assert_eq!(retrieved[0].id, 1);
        assert!((retrieved[0].score - 1.0).abs() < 1e-5);
        assert!(retrieved.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_top_k_limits_passages() {
        let engine = engine_with(&corpus(), Arc::new(ExtractiveGenerator))
            .await
            .with_query_config(QueryConfig { top_k: 1 });

        let retrieved = engine.retrieve("tokio schedules async tasks").await.unwrap();
        assert_eq!(retrieved.len(), 1);
        assert_eq!(retrieved[0].text, "tokio schedules async tasks");
    }

    #[tokio::test]
    async fn test_generate_returns_answer() {
        let engine = engine_with(&corpus(), Arc::new(ExtractiveGenerator)).await;
        let answer = engine.generate("which tasks does tokio run").await.unwrap();
        assert_eq!(answer, "tokio schedules async tasks");
    }

    #[tokio::test]
    async fn test_blank_answer_is_generation_error() {
        let engine = engine_with(&corpus(), Arc::new(SilentGenerator)).await;
        let err = engine.generate("ownership").await.unwrap_err();
        assert!(matches!(
            err,
            RagError::Generation(GenerationError::EmptyAnswer)
        ));
    }

    #[tokio::test]
    async fn test_missing_passage_is_reported() {
        let embedder = HashingProvider::new(DIM);
        let (index, passages) = shared_store();
        *index.write().await = VectorIndex::build(vec![embedder.embed_text("orphan")]).unwrap();

        let engine = RagEngine::new(
            index,
            passages,
            Arc::new(embedder),
            Arc::new(ExtractiveGenerator),
        );
        let err = engine.retrieve("orphan").await.unwrap_err();
        assert!(matches!(err, RagError::MissingPassage(0)));
    }
}
