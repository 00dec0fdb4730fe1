//! LLM client for field question-answering and embeddings.
//!
//! Talks to an Ollama-compatible API. Generation runs at low temperature so
//! field extraction stays deterministic; retrieved context is truncated at a
//! UTF-8 boundary before prompting.

mod prompts;
mod retry;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use retry::RetryPolicy;

use crate::config::LlmConfig;

/// LLM client for retrieval-augmented question answering.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

/// Ollama generate request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama generate response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

/// Ollama embeddings request format.
#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

/// Ollama embeddings response format.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // 5 min timeout for slow models
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Check if the LLM service is reachable.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Answer one field question against the retrieved context.
    ///
    /// The prompt instructs the model to answer strictly from the context
    /// and reply `Not Found` when the context has no evidence.
    pub async fn answer(&self, question: &str, context: &str) -> Result<String, LlmError> {
        let truncated = self.truncate_context(context);
        let prompt = prompts::build_qa(truncated, question);

        debug!(context_chars = truncated.chars().count(), "asking field question");
        self.generate(&prompt).await
    }

    /// Embed a chunk of text for retrieval.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = EmbeddingRequest {
            model: self.config.embedding_model.clone(),
            prompt: text.to_string(),
        };

        let url = format!("{}/api/embeddings", self.config.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(LlmError::Parse("empty embedding response".to_string()));
        }

        Ok(parsed.embedding)
    }

    /// Truncate context to the configured maximum (UTF-8 safe).
    fn truncate_context<'a>(&self, text: &'a str) -> &'a str {
        if text.len() <= self.config.max_context_chars {
            return text;
        }
        let mut end = self.config.max_context_chars;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }

    /// Call the generate endpoint with a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(parsed.response)
    }
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to connect to the LLM service
    #[error("Connection error: {0}")]
    Connection(String),

    /// API returned an error
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse a response
    #[error("Parse error: {0}")]
    Parse(String),
}

impl LlmError {
    /// Whether a retry has any chance of succeeding: transient connection
    /// failures and rate-limit/quota responses are retryable, malformed
    /// responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Connection(_) => true,
            LlmError::Api(msg) => {
                let lower = msg.to_lowercase();
                lower.contains("429") || lower.contains("quota") || lower.contains("rate limit")
            }
            LlmError::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_errors_are_retryable() {
        assert!(LlmError::Api("HTTP 429 Too Many Requests: slow down".to_string()).is_retryable());
        assert!(LlmError::Api("Quota exceeded for model".to_string()).is_retryable());
        assert!(LlmError::Connection("connection refused".to_string()).is_retryable());
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!LlmError::Api("HTTP 400: bad request".to_string()).is_retryable());
        assert!(!LlmError::Parse("unexpected end of JSON".to_string()).is_retryable());
    }

    #[test]
    fn context_truncation_respects_utf8_boundaries() {
        let mut config = LlmConfig::default();
        config.max_context_chars = 5;
        let client = LlmClient::new(config);

        // "héllo world": the accented char straddles the byte-5 boundary.
        let truncated = client.truncate_context("h\u{00e9}llo world");
        assert!(truncated.len() <= 5);
        assert!("h\u{00e9}llo world".starts_with(truncated));

        let short = client.truncate_context("abc");
        assert_eq!(short, "abc");
    }
}
