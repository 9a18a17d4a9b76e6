//! Knowledge index builder
//!
//! Loads the design-rule documents, splits them into chunks, embeds every
//! chunk and replaces the contents of the store collection with the result.
//! Missing input is reported through [`BuildOutcome`]; the store is only
//! opened once every chunk has been embedded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::ai::{AIError, EmbeddingProvider, OllamaEmbedder};
use crate::chunking::{ChunkingError, TextSplitter};
use crate::config::{PipelineConfig, COLLECTION_NAME};
use crate::documents::load_text_documents;
use crate::extract::absolute;
use crate::store::{EmbeddingRecord, StoreError, VectorStore};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] AIError),
    #[error("Vector store error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid splitter settings: {0}")]
    Chunking(#[from] ChunkingError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built { documents: usize, chunks: usize },
    MissingDirectory(PathBuf),
    NoDocuments(PathBuf),
    NoChunks,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Built { .. })
    }
}

pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: TextSplitter,
    collection: String,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            splitter: TextSplitter::default(),
            collection: COLLECTION_NAME.to_string(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, IndexError> {
        let embedder = OllamaEmbedder::with_timeout(
            Some(config.ollama_url.clone()),
            Some(config.embed_model.clone()),
            config.timeout,
        );
        Ok(Self {
            embedder: Arc::new(embedder),
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap)?,
            collection: config.collection.clone(),
        })
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub async fn build(&self, doc_dir: &Path, persist_dir: &Path) -> Result<BuildOutcome, IndexError> {
        let doc_dir_abs = absolute(doc_dir);
        tracing::info!("Loading documents from {}", doc_dir_abs.display());

        if !doc_dir.is_dir() {
            tracing::error!("Document directory does not exist: {}", doc_dir_abs.display());
            return Ok(BuildOutcome::MissingDirectory(doc_dir_abs));
        }

        let documents = load_text_documents(doc_dir)?;
        if documents.is_empty() {
            tracing::error!("No .txt files found in {}", doc_dir_abs.display());
            return Ok(BuildOutcome::NoDocuments(doc_dir_abs));
        }
        tracing::info!("Loaded {} documents", documents.len());

        let chunks = self.splitter.split_documents(&documents);
        if chunks.is_empty() {
            tracing::error!("Splitting produced no chunks; are the documents empty?");
            return Ok(BuildOutcome::NoChunks);
        }
        tracing::info!(
            "Split into {} chunks (size {}, overlap {})",
            chunks.len(),
            self.splitter.chunk_size(),
            self.splitter.chunk_overlap()
        );

        let mut records = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.into_iter().enumerate() {
            let embedding = match self.embedder.embed_query(&chunk.page_content).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    tracing::error!("Embedding chunk {} failed: {}", i, e);
                    tracing::error!("Make sure Ollama is running: ollama serve");
                    tracing::error!(
                        "Make sure the model is pulled: ollama pull {}",
                        self.embedder.model_name()
                    );
                    return Err(e.into());
                }
            };
            records.push(EmbeddingRecord {
                id: Uuid::new_v4().to_string(),
                embedding,
                document: chunk.page_content,
                metadata: chunk.metadata,
            });
        }
        tracing::info!(
            "Embedded {} chunks with {}",
            records.len(),
            self.embedder.model_name()
        );

        let mut store = VectorStore::open(persist_dir)?;
        match store.delete_collection(&self.collection) {
            Ok(()) => tracing::info!("Dropped previous collection {}", self.collection),
            Err(StoreError::CollectionNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        store.create_collection(&self.collection)?;
        let added = store.add(&self.collection, &records)?;

        tracing::info!(
            "Stored {} chunks in collection {} at {}",
            added,
            self.collection,
            absolute(persist_dir).display()
        );

        Ok(BuildOutcome::Built {
            documents: documents.len(),
            chunks: added,
        })
    }
}

/// Build the index with settings taken from `config`.
pub async fn build_index(config: &PipelineConfig) -> Result<BuildOutcome, IndexError> {
    IndexBuilder::from_config(config)?
        .build(&config.docs_dir, &config.persist_dir)
        .await
}
