//! Ollama Client
//!
//! Non-streamed text generation against a local Ollama server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::provider::{LanguageModel, ModelInfo};
use crate::ai::AIError;
use crate::config::{DEFAULT_LLM_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS};

/// Client for interacting with Ollama
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        Self::with_timeout(base_url, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: Option<String>, model: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if Ollama is running and the model is pulled
    pub async fn health_check(&self) -> Result<bool, AIError> {
        match self.list_models().await {
            Ok(models) => Ok(is_model_installed(&models, &self.model)),
            Err(AIError::RequestFailed(_)) => Ok(false),
            Err(AIError::ApiError { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List pulled models
    pub async fn list_models(&self) -> Result<Vec<String>, AIError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(AIError::RequestFailed)?;

        if !response.status().is_success() {
            return Err(AIError::ApiError {
                status: response.status().as_u16(),
                message: "Failed to list models".to_string(),
            });
        }

        let models: ModelList = response
            .json()
            .await
            .map_err(|e| AIError::ParseError(e.to_string()))?;

        Ok(models.models.into_iter().map(|m| m.name).collect())
    }

    /// Generate a completion
    pub async fn generate(&self, prompt: &str) -> Result<String, AIError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        tracing::debug!(
            "Sending {} char prompt to Ollama model {}",
            prompt.chars().count(),
            self.model
        );

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

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AIError::ParseError(e.to_string()))?;

        tracing::debug!(
            "Ollama returned {} tokens in {} ms",
            body.eval_count.unwrap_or(0),
            body.total_duration.unwrap_or(0) / 1_000_000
        );

        Ok(body.response)
    }
}

/// Whether `wanted` is among the tags reported by `/api/tags`.
pub fn is_model_installed(models: &[String], wanted: &str) -> bool {
    models.iter().any(|m| model_matches(m, wanted))
}

/// `qwen3` matches `qwen3:latest`; `qwen3:4b` matches only itself.
fn model_matches(available: &str, wanted: &str) -> bool {
    if available == wanted {
        return true;
    }
    match (available.split_once(':'), wanted.contains(':')) {
        (Some((name, "latest")), false) => name == wanted,
        _ => false,
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    async fn complete(&self, prompt: &str) -> Result<String, AIError> {
        self.generate(prompt).await
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "ollama".to_string(),
            model_name: self.model.clone(),
            is_local: true,
            temperature: self.temperature,
        }
    }
}
