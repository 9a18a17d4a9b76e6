//! Retrieval-augmented question answering
//!
//! [`VectorIndex`] pairs a store collection with the embedder that filled
//! it. [`RetrievalQa`] retrieves the top-k chunks for a query, stuffs them
//! into a prompt and asks the language model once.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::ai::prompts::{PromptError, PromptTemplate, CONTEXT_VAR, QUESTION_VAR};
use crate::ai::{AIError, EmbeddingProvider, LanguageModel};
use crate::documents::Document;
use crate::store::{ScoredDocument, StoreError, VectorStore};

pub const DOCUMENT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Vector store error: {0}")]
    Store(#[from] StoreError),
    #[error("Embedding failed: {0}")]
    Embedding(#[source] AIError),
    #[error("Generation failed: {0}")]
    Generation(#[source] AIError),
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),
}

pub struct VectorIndex {
    store: VectorStore,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
}

impl VectorIndex {
    /// Open an existing store directory and bind to `collection`, creating
    /// the collection if the store does not have it yet.
    pub fn open(
        persist_dir: &Path,
        collection: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RetrievalError> {
        let store = VectorStore::open_existing(persist_dir)?;
        store.get_or_create_collection(collection)?;
        Ok(Self {
            store,
            embedder,
            collection: collection.to_string(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.store.count(&self.collection)?)
    }

    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(RetrievalError::Embedding)?;
        Ok(self
            .store
            .similarity_search_by_vector(&self.collection, &vector, k)?)
    }

    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>, RetrievalError> {
        let hits = self.similarity_search_with_score(query, k).await?;
        Ok(hits.into_iter().map(|hit| hit.document).collect())
    }
}

#[derive(Debug, Clone)]
pub struct QaAnswer {
    pub result: String,
    pub source_documents: Vec<Document>,
}

pub struct RetrievalQa<'a> {
    index: &'a VectorIndex,
    llm: &'a dyn LanguageModel,
    prompt: PromptTemplate,
    k: usize,
}

impl<'a> RetrievalQa<'a> {
    pub fn new(
        index: &'a VectorIndex,
        llm: &'a dyn LanguageModel,
        prompt: PromptTemplate,
        k: usize,
    ) -> Self {
        Self { index, llm, prompt, k }
    }

    pub async fn invoke(&self, query: &str) -> Result<QaAnswer, RetrievalError> {
        let docs = self.index.similarity_search(query, self.k).await?;
        tracing::debug!("Retrieved {} chunks for the query", docs.len());

        let context = docs
            .iter()
            .map(|d| d.page_content.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);

        let prompt = self
            .prompt
            .render(&[(CONTEXT_VAR, context.as_str()), (QUESTION_VAR, query)])?;

        let result = self
            .llm
            .complete(&prompt)
            .await
            .map_err(RetrievalError::Generation)?;

        Ok(QaAnswer {
            result,
            source_documents: docs,
        })
    }
}
