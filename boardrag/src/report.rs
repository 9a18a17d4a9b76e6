//! Design review report generation
//!
//! Turns a board summary into a short natural-language query, retrieves the
//! most relevant design-rule chunks for it and asks the language model for a
//! review grounded in those rules.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::ai::prompts::{design_query, review_prompt, DesignStats};
use crate::ai::{EmbeddingProvider, LanguageModel, OllamaClient, OllamaEmbedder};
use crate::config::{PipelineConfig, COLLECTION_NAME, DEFAULT_PERSIST_DIR, DEFAULT_TOP_K};
use crate::extract::{absolute, load_summary, BoardSummary, ExtractError};
use crate::rag::{RetrievalError, RetrievalQa, VectorIndex};

const PROBE_QUERY: &str = "test";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Summary file does not exist: {}", .0.display())]
    SummaryNotFound(PathBuf),
    #[error("Vector store does not exist, run build-index first: {}", .0.display())]
    IndexNotFound(PathBuf),
    #[error("Failed to read summary: {0}")]
    Summary(#[source] ExtractError),
    #[error("Failed to load vector store: {0}")]
    Store(#[source] RetrievalError),
    #[error("Analysis failed: {0}")]
    Retrieval(#[source] RetrievalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExtractError> for ReportError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::SummaryNotFound(path) => ReportError::SummaryNotFound(path),
            other => ReportError::Summary(other),
        }
    }
}

pub struct ReportGenerator {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LanguageModel>,
    persist_dir: PathBuf,
    collection: String,
    top_k: usize,
}

impl ReportGenerator {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            embedder,
            llm,
            persist_dir: PathBuf::from(DEFAULT_PERSIST_DIR),
            collection: COLLECTION_NAME.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        let embedder = OllamaEmbedder::with_timeout(
            Some(config.ollama_url.clone()),
            Some(config.embed_model.clone()),
            config.timeout,
        );
        let llm = OllamaClient::with_timeout(
            Some(config.ollama_url.clone()),
            Some(config.llm_model.clone()),
            config.timeout,
        )
        .with_temperature(config.temperature);

        Self {
            embedder: Arc::new(embedder),
            llm: Arc::new(llm),
            persist_dir: config.persist_dir.clone(),
            collection: config.collection.clone(),
            top_k: config.top_k,
        }
    }

    pub fn with_persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = dir.into();
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Load the summary at `summary_path` and analyze it.
    pub async fn run(&self, summary_path: &Path) -> Result<String, ReportError> {
        let summary = load_summary(summary_path)?;
        tracing::info!(
            "Loaded board summary: {} tracks, {} components",
            summary.tracks.len(),
            summary.components.len()
        );
        self.analyze(&summary).await
    }

    pub async fn analyze(&self, summary: &BoardSummary) -> Result<String, ReportError> {
        if !self.persist_dir.is_dir() {
            return Err(ReportError::IndexNotFound(absolute(&self.persist_dir)));
        }

        let index = self.load_index().await?;

        let stats = DesignStats::from_summary(summary);
        let query = design_query(&stats);
        tracing::debug!("Design query: {}", query.trim());

        tracing::info!(
            "Analyzing with {} (top {} rule chunks)",
            self.llm.model_info().model_name,
            self.top_k
        );
        let qa = RetrievalQa::new(&index, self.llm.as_ref(), review_prompt(), self.top_k);
        let answer = qa.invoke(&query).await.map_err(ReportError::Retrieval)?;

        for doc in &answer.source_documents {
            tracing::debug!("Used rule chunk from {}", doc.source().unwrap_or("<unknown>"));
        }

        Ok(answer.result)
    }

    async fn load_index(&self) -> Result<VectorIndex, ReportError> {
        let probe = async {
            let index = VectorIndex::open(&self.persist_dir, &self.collection, self.embedder.clone())?;
            let hits = index.similarity_search(PROBE_QUERY, 1).await?;
            Ok::<_, RetrievalError>((index, hits.len()))
        };

        match probe.await {
            Ok((index, hits)) => {
                tracing::info!("Vector store loaded, probe query returned {} results", hits);
                Ok(index)
            }
            Err(e) => {
                tracing::error!("Failed to load vector store: {}", e);
                tracing::error!("Make sure that:");
                tracing::error!("  1. The index was built successfully with build-index");
                tracing::error!("  2. Ollama is running (ollama serve)");
                tracing::error!(
                    "  3. The models are pulled: ollama pull {} and ollama pull {}",
                    self.embedder.model_name(),
                    self.llm.model_info().model_name
                );
                Err(ReportError::Store(e))
            }
        }
    }
}

/// Write the report text verbatim.
pub fn write_report(report: &str, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, report)?;
    tracing::info!("Report saved to {}", absolute(path).display());
    Ok(())
}

/// Record a failure message in `path`, replacing earlier contents.
pub fn write_error_log(message: &str, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, message)
}
