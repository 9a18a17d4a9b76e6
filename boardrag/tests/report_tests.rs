//! Report generation over a real store with fake model clients.

mod common;

use std::sync::Arc;

use boardrag::extract::{extract_board_summary, write_summary};
use boardrag::rag::RetrievalError;
use boardrag::report::ReportError;
use boardrag::StoreError;
use boardrag::{BoardSummary, IndexBuilder, ReportGenerator};
use common::{
    fixture_board, fixture_docs, ConstantEmbedder, FailingEmbedder, HashingEmbedder,
    RecordingModel,
};

const REPLY: &str = "1. Track /SDA is 0.152 mm, above the 0.15 mm minimum (3.1).";

async fn built_index(persist: &std::path::Path) {
    IndexBuilder::new(Arc::new(HashingEmbedder::default()))
        .build(&fixture_docs(), persist)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_report_is_model_reply_verbatim() {
    let work = tempfile::tempdir().unwrap();
    let persist = work.path().join("chroma_db");
    built_index(&persist).await;

    let summary_path = work.path().join("pcb_data.json");
    let summary = extract_board_summary(&fixture_board()).unwrap();
    write_summary(&summary, &summary_path).unwrap();

    let llm = Arc::new(RecordingModel::new(REPLY));
    let report = ReportGenerator::new(Arc::new(HashingEmbedder::default()), llm.clone())
        .with_persist_dir(&persist)
        .run(&summary_path)
        .await
        .unwrap();

    assert_eq!(report, REPLY);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.contains("Minimum track width: 0.152 mm"));
    assert!(prompt.contains("Component count: 2"));
    assert!(prompt.contains("Track count: 5"));
    // Three small documents, top 4: every chunk is retrieved.
    assert!(prompt.contains("3.1 Signal traces on outer layers"));
    assert!(prompt.contains("5.1 Every IC power pin"));
    assert!(prompt.contains("6.2 Vias carrying power"));
    assert!(!prompt.contains("{context}"));
}

#[tokio::test]
async fn test_top_k_limits_retrieved_chunks() {
    let work = tempfile::tempdir().unwrap();
    let persist = work.path().join("chroma_db");
    built_index(&persist).await;

    let llm = Arc::new(RecordingModel::new(REPLY));
    ReportGenerator::new(Arc::new(HashingEmbedder::default()), llm.clone())
        .with_persist_dir(&persist)
        .with_top_k(1)
        .analyze(&BoardSummary::default())
        .await
        .unwrap();

    let prompt = &llm.prompts()[0];
    let sections = ["Section 3", "Section 5", "Section 6"]
        .iter()
        .filter(|s| prompt.contains(*s))
        .count();
    assert_eq!(sections, 1);
}

#[tokio::test]
async fn test_zero_tracks_uses_zero_width() {
    let work = tempfile::tempdir().unwrap();
    let persist = work.path().join("chroma_db");
    built_index(&persist).await;

    let llm = Arc::new(RecordingModel::new("Cannot determine"));
    let report = ReportGenerator::new(Arc::new(HashingEmbedder::default()), llm.clone())
        .with_persist_dir(&persist)
        .analyze(&BoardSummary::default())
        .await
        .unwrap();

    assert_eq!(report, "Cannot determine");
    assert!(llm.prompts()[0].contains("Minimum track width: 0.000 mm"));
}

#[tokio::test]
async fn test_missing_store_fails_before_any_model_call() {
    let work = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HashingEmbedder::default());
    let llm = Arc::new(RecordingModel::new(REPLY));

    let err = ReportGenerator::new(embedder.clone(), llm.clone())
        .with_persist_dir(work.path().join("chroma_db"))
        .analyze(&BoardSummary::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::IndexNotFound(ref p) if p.is_absolute()));
    assert_eq!(embedder.calls(), 0);
    assert!(llm.prompts().is_empty());
    assert!(!work.path().join("chroma_db").exists());
}

#[tokio::test]
async fn test_missing_summary() {
    let work = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HashingEmbedder::default());

    let err = ReportGenerator::new(embedder.clone(), Arc::new(RecordingModel::new(REPLY)))
        .with_persist_dir(work.path())
        .run(&work.path().join("pcb_data.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::SummaryNotFound(_)));
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_probe_failure_is_a_store_error() {
    let work = tempfile::tempdir().unwrap();
    let persist = work.path().join("chroma_db");
    built_index(&persist).await;

    let llm = Arc::new(RecordingModel::new(REPLY));
    let err = ReportGenerator::new(Arc::new(FailingEmbedder::new(0)), llm.clone())
        .with_persist_dir(&persist)
        .analyze(&BoardSummary::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Store(_)));
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn test_embedder_with_other_dimension_is_a_store_error() {
    let work = tempfile::tempdir().unwrap();
    let persist = work.path().join("chroma_db");
    built_index(&persist).await;

    let llm = Arc::new(RecordingModel::new(REPLY));
    let err = ReportGenerator::new(Arc::new(ConstantEmbedder::new(8)), llm.clone())
        .with_persist_dir(&persist)
        .analyze(&BoardSummary::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReportError::Store(RetrievalError::Store(StoreError::DimensionMismatch {
            expected: common::DIMENSIONS,
            found: 8,
        }))
    ));
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn test_empty_store_still_answers() {
    let work = tempfile::tempdir().unwrap();
    let persist = work.path().join("chroma_db");
    std::fs::create_dir(&persist).unwrap();

    let llm = Arc::new(RecordingModel::new("Cannot determine"));
    let report = ReportGenerator::new(Arc::new(HashingEmbedder::default()), llm.clone())
        .with_persist_dir(&persist)
        .analyze(&BoardSummary::default())
        .await
        .unwrap();

    assert_eq!(report, "Cannot determine");
    assert!(llm.prompts()[0].contains("Design rules:\n\n\nDesign data:"));
}
