//! Answer generation from a question and its retrieved passages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised by a [`Generator`].
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Provider not configured.
    #[error("generation provider not configured")]
    NotConfigured,

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The model produced no text.
    #[error("model returned an empty answer")]
    EmptyAnswer,

    /// No passages were supplied to a generator that needs them.
    #[error("no passages to answer from")]
    NoContext,

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// The sequence-generation model.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Answer `question` given `passages` in rank order.
    async fn generate(
        &self,
        question: &str,
        passages: &[String],
    ) -> std::result::Result<String, GenerationError>;
}

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question using only \
the numbered context passages below. If they do not contain the answer, say that you don't know.";

/// Render the system prompt with numbered passages.
pub fn build_prompt(passages: &[String]) -> String {
    let mut prompt = format!("{SYSTEM_PROMPT}\n\nContext:");
    for (i, passage) in passages.iter().enumerate() {
        prompt.push_str(&format!("\n[{}] {}", i + 1, passage.trim()));
    }
    prompt
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIGenerator {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIGenerator {
    /// Create a generator, reading the key from `OPENAI_API_KEY`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 200,
            temperature: 0.2,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for OpenAIGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        question: &str,
        passages: &[String],
    ) -> std::result::Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(GenerationError::NotConfigured)?;

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: build_prompt(passages),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: question.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(
            "Requesting completion from {} with {} passages",
            self.model,
            passages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiRequest(format!(
                "{status}: {error_text}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices in response".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Offline generator that answers with the best-ranked passage.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn generate(
        &self,
        _question: &str,
        passages: &[String],
    ) -> std::result::Result<String, GenerationError> {
        passages
            .first()
            .map(|p| p.trim().to_string())
            .ok_or(GenerationError::NoContext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn passages() -> Vec<String> {
        vec!["Ferris is a crab.".to_string(), " Crabs walk sideways. ".to_string()]
    }

    #[test]
    fn test_build_prompt_numbers_passages() {
        let prompt = build_prompt(&passages());
        assert!(prompt.ends_with("Context:\n[1] Ferris is a crab.\n[2] Crabs walk sideways."));
    }

    #[tokio::test]
    async fn test_extractive_uses_first_passage() {
        let answer = ExtractiveGenerator
            .generate("who is ferris?", &passages())
            .await
            .unwrap();
        assert_eq!(answer, "Ferris is a crab.");
    }

    #[tokio::test]
    async fn test_extractive_without_passages() {
        let err = ExtractiveGenerator.generate("q", &[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::NoContext));
    }

    #[tokio::test]
    async fn test_openai_generator_sends_question_and_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer k"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "max_tokens": 200,
                "messages": [
                    {"role": "system", "content": build_prompt(&passages())},
                    {"role": "user", "content": "who is ferris?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "A crab."}}]
            })))
            .mount(&server)
            .await;

        let generator = OpenAIGenerator::new()
            .with_api_key("k")
            .with_base_url(server.uri())
            .with_model("test-model");
        let answer = generator
            .generate("who is ferris?", &passages())
            .await
            .unwrap();

        assert_eq!(answer, "A crab.");
    }

    #[tokio::test]
    async fn test_openai_generator_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let generator = OpenAIGenerator::new()
            .with_api_key("k")
            .with_base_url(server.uri());
        let err = generator.generate("q", &passages()).await.unwrap_err();

        assert!(matches!(err, GenerationError::ApiRequest(msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_openai_generator_without_key() {
        let generator = OpenAIGenerator {
            api_key: None,
            ..OpenAIGenerator::new()
        };
        let err = generator.generate("q", &passages()).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured));
    }
}
