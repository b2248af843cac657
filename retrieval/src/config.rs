//! Configuration for ingestion, retrieval and generation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragbot_embeddings::{
    CachedProvider, DEFAULT_DIMENSION, EmbeddingCache, EmbeddingProvider, HashingProvider,
    OpenAIProvider,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RagError, Result};
use crate::generation::{ExtractiveGenerator, Generator, OpenAIGenerator};

/// Top-level configuration, usually read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Where records are fetched from.
    pub source: SourceConfig,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Generation model configuration.
    pub generation: GenerationConfig,

    /// Query processing configuration.
    pub query: QueryConfig,
}

impl RagConfig {
    /// Read a TOML configuration file. Missing sections take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RagError::Config(format!("{}: {e}", path.display())))?;
        config.validate().map_err(|e| match e {
            RagError::Config(msg) => RagError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject values no run can work with.
    pub fn validate(&self) -> Result<()> {
        if self.query.top_k == 0 {
            return Err(RagError::Config(
                "query.top_k must be at least 1".to_string(),
            ));
        }
        if self.source.text_field.split('.').any(str::is_empty) {
            return Err(RagError::Config(format!(
                "source.text_field `{}` is not a valid field path",
                self.source.text_field
            )));
        }
        Ok(())
    }

    /// Load `path` if given; otherwise the default location if it exists,
    /// falling back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `<config dir>/ragbot/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ragbot").join("config.toml"))
    }

    /// Set the source configuration.
    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the generation configuration.
    pub fn with_generation(mut self, config: GenerationConfig) -> Self {
        self.generation = config;
        self
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.query = config;
        self
    }
}

/// Configuration for the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// URL returning a JSON array of records.
    pub url: Option<String>,

    /// Dotted path of the text field in each record.
    pub text_field: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            text_field: "text".to_string(),
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
    /// Local feature hashing, no network.
    Hashing,
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings.
    pub model: Option<String>,

    /// Override for the API base URL.
    pub base_url: Option<String>,

    /// Vector width for the hashing provider.
    pub dimension: usize,

    /// Whether to cache embeddings.
    pub cache_enabled: bool,

    /// Maximum cache size.
    pub cache_max_entries: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::OpenAI,
            model: None,
            base_url: None,
            dimension: DEFAULT_DIMENSION,
            cache_enabled: true,
            cache_max_entries: 10_000,
        }
    }
}

impl EmbeddingConfig {
    /// Construct the configured provider.
    pub fn build_provider(&self) -> Arc<dyn EmbeddingProvider> {
        match self.provider {
            EmbeddingProviderType::OpenAI => {
                let mut provider = OpenAIProvider::new();
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if let Some(url) = &self.base_url {
                    provider = provider.with_base_url(url);
                }
                self.maybe_cached(provider)
            }
            EmbeddingProviderType::Hashing => {
                self.maybe_cached(HashingProvider::new(self.dimension))
            }
        }
    }

    fn maybe_cached<P: EmbeddingProvider + 'static>(&self, provider: P) -> Arc<dyn EmbeddingProvider> {
        if self.cache_enabled {
            Arc::new(CachedProvider::new(
                provider,
                EmbeddingCache::new(self.cache_max_entries),
            ))
        } else {
            Arc::new(provider)
        }
    }
}

/// Type of generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorType {
    /// OpenAI-compatible chat completions API.
    #[serde(rename = "openai")]
    OpenAI,
    /// Answer with the best passage, no network.
    Extractive,
}

/// Configuration for the generation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Which generator to use.
    pub provider: GeneratorType,

    /// Chat model name.
    pub model: String,

    /// Override for the API base URL.
    pub base_url: Option<String>,

    /// Upper bound on answer length in tokens.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GeneratorType::OpenAI,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            max_tokens: 200,
            temperature: 0.2,
        }
    }
}

impl GenerationConfig {
    /// Construct the configured generator.
    pub fn build_generator(&self) -> Arc<dyn Generator> {
        match self.provider {
            GeneratorType::OpenAI => {
                let mut generator = OpenAIGenerator::new()
                    .with_model(&self.model)
                    .with_max_tokens(self.max_tokens)
                    .with_temperature(self.temperature);
                if let Some(url) = &self.base_url {
                    generator = generator.with_base_url(url);
                }
                Arc::new(generator)
            }
            GeneratorType::Extractive => Arc::new(ExtractiveGenerator),
        }
    }
}

/// Configuration for query processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of passages retrieved per question.
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}
