//! The write path: fetch records, embed them, grow the index.

use std::sync::Arc;

use ragbot_embeddings::{EmbeddingProvider, EmbeddingRequest};
use ragbot_index::VectorIndex;
use tracing::{debug, info, warn};

use crate::error::{RagError, Result};
use crate::passage::Passage;
use crate::source::{DataSource, Record, extract_text, remove_field};
use crate::{SharedIndex, SharedPassages};

/// Fetches records from a [`DataSource`], embeds their text and appends the
/// vectors and passages to the shared store.
///
/// The first run that yields records builds the index; later runs add to
/// it. Records keep the order the source returned them in, so the id of
/// each vector is also the id of its passage.
pub struct IngestionPipeline {
    source: Arc<dyn DataSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: SharedIndex,
    passages: SharedPassages,
    text_field: String,
    model: Option<String>,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn DataSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: SharedIndex,
        passages: SharedPassages,
    ) -> Self {
        Self {
            source,
            embedder,
            index,
            passages,
            text_field: "text".to_string(),
            model: None,
        }
    }

    /// Read passage text from this (dotted) field instead of `text`.
    pub fn with_text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = field.into();
        self
    }

    /// Request a specific embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Run one ingestion pass and return the number of vectors added.
    ///
    /// Nothing is written unless every record has text, every embedding
    /// succeeds and the index accepts the batch.
    pub async fn run(&self) -> Result<usize> {
        let records = self.source.fetch().await?;
        if records.is_empty() {
            warn!("Source {} returned no records", self.source.name());
            return Ok(0);
        }

        let passages = records
            .into_iter()
            .enumerate()
            .map(|(position, record)| self.to_passage(position, record))
            .collect::<Result<Vec<_>>>()?;

        let requests = passages
            .iter()
            .map(|p| {
                let request = EmbeddingRequest::new(p.text.clone());
                match &self.model {
                    Some(model) => request.with_model(model),
                    None => request,
                }
            })
            .collect();
        let responses = self.embedder.embed_batch(requests).await?;

        if responses.len() != passages.len() {
            return Err(RagError::Embedding(
                ragbot_embeddings::EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    passages.len(),
                    responses.len()
                )),
            ));
        }
        let vectors: Vec<Vec<f32>> = responses.into_iter().map(|r| r.embedding).collect();
        let count = vectors.len();

        // Lock order: index, then passages.
        let mut index = self.index.write().await;
        let mut store = self.passages.write().await;

        if index.len() != store.len() {
            return Err(RagError::StoreOutOfSync {
                vectors: index.len(),
                passages: store.len(),
            });
        }

        if index.is_built() {
            index.add(vectors)?;
        } else {
            *index = VectorIndex::build(vectors)?;
        }
        let first_id = store.extend(passages);

        info!(
            "Ingested {count} records from {} (ids {first_id}..{})",
            self.source.name(),
            first_id + count
        );
        Ok(count)
    }

    fn to_passage(&self, position: usize, record: Record) -> Result<Passage> {
        let text = extract_text(&record, &self.text_field)
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| RagError::MalformedRecord {
                position,
                field: self.text_field.clone(),
            })?;

        let metadata = match record {
            serde_json::Value::Object(mut fields) => {
                remove_field(&mut fields, &self.text_field);
                (!fields.is_empty()).then_some(serde_json::Value::Object(fields))
            }
            _ => None,
        };

        debug!("Prepared passage {position} ({} chars)", text.len());
        Ok(Passage { text, metadata })
    }
}
