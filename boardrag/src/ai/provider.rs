//! Language model trait
//!
//! Common interface for completion backends so the retrieval chain can be
//! driven by Ollama in production and by fakes in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::AIError;

/// Information about a language model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Backend name (e.g. "ollama")
    pub provider: String,

    /// Model tag (e.g. "qwen3:4b")
    pub model_name: String,

    /// Whether the model runs on this machine
    pub is_local: bool,

    pub temperature: f32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the backend answers and has the model.
    async fn is_available(&self) -> bool;

    /// One non-streamed completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, AIError>;

    fn model_info(&self) -> ModelInfo;
}
