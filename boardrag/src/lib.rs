//! BoardRAG - KiCad board review against your own design rules
//!
//! Three pipelines share this crate:
//!
//! 1. **Extraction** reads a `.kicad_pcb` file and writes a JSON summary of
//!    its traces, vias, components and nets.
//! 2. **Indexing** splits plain-text design-rule documents into chunks,
//!    embeds them with a local Ollama model and stores them in a persistent
//!    vector store.
//! 3. **Reporting** turns the summary into a query, retrieves the most
//!    relevant rules and asks a local language model for a review.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! let summary = boardrag::extract_board(Path::new("board.kicad_pcb")).unwrap();
//! println!(
//!     "{} tracks, {} vias, min width {:?} mm",
//!     summary.tracks.len(),
//!     summary.vias.len(),
//!     summary.min_track_width_mm()
//! );
//! ```
//!
//! Indexing and reporting need a running Ollama server; see
//! [`index::IndexBuilder`] and [`report::ReportGenerator`].

pub mod ai;
pub mod chunking;
pub mod config;
pub mod core;
pub mod documents;
pub mod extract;
pub mod index;
pub mod logging;
pub mod parser;
pub mod rag;
pub mod report;
pub mod store;

// Re-export main types
pub use crate::core::{discover_files, BoardRagError};
pub use ai::{AIError, DesignStats, EmbeddingProvider, LanguageModel, OllamaClient, OllamaEmbedder};
pub use chunking::TextSplitter;
pub use config::PipelineConfig;
pub use documents::Document;
pub use extract::{BoardSummary, ComponentRecord, ExtractError, TrackRecord, ViaRecord};
pub use index::{BuildOutcome, IndexBuilder, IndexError};
pub use parser::board::{Board, BoardItem, BoardLoadError};
pub use report::{ReportError, ReportGenerator};
pub use store::{StoreError, VectorStore};

/// Load a board and summarize it (convenience wrapper).
pub fn extract_board(path: &std::path::Path) -> Result<BoardSummary, BoardRagError> {
    Ok(extract::extract_board_summary(path)?)
}

/// Load a board without summarizing it (convenience wrapper).
pub fn parse_board(path: &std::path::Path) -> Result<Board, BoardRagError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(extract::absolute(path)).into());
    }
    Board::load(path).map_err(|e| BoardRagError::Extract(e.into()))
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BoardRagError, BoardSummary, BuildOutcome, EmbeddingProvider, IndexBuilder, LanguageModel,
        PipelineConfig, ReportGenerator,
    };
}
