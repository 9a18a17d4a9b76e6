//! Pipeline configuration
//!
//! Defaults for every model name, path and tuning knob, with optional
//! overrides from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::ai::normalize_base_url;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_LLM_MODEL: &str = "qwen3:4b";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const COLLECTION_NAME: &str = "kicad_docs";
pub const DEFAULT_DOCS_DIR: &str = "./docs";
pub const DEFAULT_PERSIST_DIR: &str = "./chroma_db";
pub const DEFAULT_SUMMARY_FILE: &str = "pcb_data.json";
pub const DEFAULT_REPORT_FILE: &str = "pcb_analysis_report.txt";
pub const DEFAULT_ERROR_LOG: &str = "error.log";

pub const EXTRACT_LOG_FILE: &str = "script_debug.log";
pub const BUILD_INDEX_LOG_FILE: &str = "build_vector_db.log";
pub const INSPECT_LOG_FILE: &str = "inspect_pcb.log";

pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_EMBED_MODEL: &str = "BOARDRAG_EMBED_MODEL";
pub const ENV_LLM_MODEL: &str = "BOARDRAG_LLM_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "BOARDRAG_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub ollama_url: String,
    pub embed_model: String,
    pub llm_model: String,
    pub temperature: f32,
    pub top_k: usize,
    pub timeout: Duration,
    pub collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub docs_dir: PathBuf,
    pub persist_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            collection: COLLECTION_NAME.to_string(),
            chunk_size: crate::chunking::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::chunking::DEFAULT_CHUNK_OVERLAP,
            docs_dir: PathBuf::from(DEFAULT_DOCS_DIR),
            persist_dir: PathBuf::from(DEFAULT_PERSIST_DIR),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `OLLAMA_HOST`, `BOARDRAG_EMBED_MODEL`,
    /// `BOARDRAG_LLM_MODEL` and `BOARDRAG_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty(ENV_OLLAMA_HOST) {
            config.ollama_url = normalize_base_url(&host);
        }
        if let Some(model) = non_empty(ENV_EMBED_MODEL) {
            config.embed_model = model;
        }
        if let Some(model) = non_empty(ENV_LLM_MODEL) {
            config.llm_model = model;
        }
        match non_empty(ENV_TIMEOUT_SECS).map(|s| s.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => config.timeout = Duration::from_secs(secs),
            Some(_) => tracing::warn!(
                "Ignoring invalid {}; using {}s",
                ENV_TIMEOUT_SECS,
                DEFAULT_TIMEOUT_SECS
            ),
            None => {}
        }

        config
    }

    pub fn with_docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.docs_dir = dir.into();
        self
    }

    pub fn with_persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = dir.into();
        self
    }

    pub fn with_llm_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = model.into();
        self
    }
}
