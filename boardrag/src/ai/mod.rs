//! Model clients: embeddings, text generation and prompt templates.

pub mod embeddings;
pub mod ollama;
pub mod prompts;
pub mod provider;

pub use embeddings::{EmbeddingProvider, OllamaEmbedder};
pub use ollama::OllamaClient;
pub use prompts::{design_query, review_prompt, DesignStats, PromptError, PromptTemplate};
pub use provider::{LanguageModel, ModelInfo};

#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("API request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
    #[error("Cannot embed empty text")]
    EmptyInput,
}

/// Prefix `http://` when the host has no scheme, and drop a trailing slash.
pub fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_base_url("https://gpu.lan/"), "https://gpu.lan");
        assert_eq!(normalize_base_url(" http://127.0.0.1:11434 "), "http://127.0.0.1:11434");
    }
}
