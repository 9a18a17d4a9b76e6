//! Network-free stand-ins for the Ollama clients.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use boardrag::ai::ModelInfo;
use boardrag::{AIError, EmbeddingProvider, LanguageModel};

pub const DIMENSIONS: usize = 32;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn fixture_board() -> PathBuf {
    fixtures_dir().join("board.kicad_pcb")
}

pub fn fixture_docs() -> PathBuf {
    fixtures_dir().join("docs")
}

/// Bag-of-words vectors: each lowercase word bumps one hashed bucket.
#[derive(Default)]
pub struct HashingEmbedder {
    pub calls: AtomicUsize,
}

impl HashingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn hash_embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMENSIONS];
    for word in text.split_whitespace() {
        let word = word.to_lowercase();
        let h = word
            .bytes()
            .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
        v[h as usize % DIMENSIONS] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing-test"
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AIError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(hash_embed(text))
    }
}

/// Returns the same all-ones vector of a fixed width for every text.
pub struct ConstantEmbedder {
    pub dimensions: usize,
    pub calls: AtomicUsize,
}

impl ConstantEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for ConstantEmbedder {
    fn model_name(&self) -> &str {
        "constant-test"
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, AIError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1.0; self.dimensions])
    }
}

/// Fails after `succeed_first` successful calls.
pub struct FailingEmbedder {
    pub succeed_first: usize,
    pub calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new(succeed_first: usize) -> Self {
        Self {
            succeed_first,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing-test"
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AIError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.succeed_first {
            Ok(hash_embed(text))
        } else {
            Err(AIError::ApiError {
                status: 503,
                message: "model not loaded".to_string(),
            })
        }
    }
}

/// Records every prompt and answers with a canned reply.
pub struct RecordingModel {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &str) -> Result<String, AIError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "test".to_string(),
            model_name: "recording".to_string(),
            is_local: true,
            temperature: 0.1,
        }
    }
}
