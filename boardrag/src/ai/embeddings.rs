//! Text embeddings
//!
//! [`EmbeddingProvider`] is the seam between the pipelines and whatever
//! produces vectors. [`OllamaEmbedder`] talks to a local Ollama server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::AIError;
use crate::config::{DEFAULT_EMBED_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TIMEOUT_SECS};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Embed a single piece of text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AIError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        Self::with_timeout(base_url, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: Option<String>, model: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AIError> {
        if text.is_empty() {
            return Err(AIError::EmptyInput);
        }

        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        tracing::debug!("Embedding {} chars with {}", text.chars().count(), self.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(AIError::RequestFailed)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AIError::ApiError { status, message });
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AIError::ParseError(e.to_string()))?;

        if body.embedding.is_empty() {
            return Err(AIError::InvalidResponse(format!(
                "model {} returned an empty embedding",
                self.model
            )));
        }

        Ok(body.embedding)
    }
}
