//! Persistent vector store
//!
//! A directory holding one SQLite database (`chroma.sqlite3`) with named
//! collections of embedded documents. Vectors are stored as little-endian
//! `f32` blobs and searched by brute-force cosine similarity.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::documents::Document;

pub const DB_FILE_NAME: &str = "chroma.sqlite3";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS embeddings (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
    document TEXT NOT NULL,
    metadata_json TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    embedding BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_embeddings_collection ON embeddings(collection);
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Vector store does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Collection {0} does not exist")]
    CollectionNotFound(String),
    #[error("Invalid vector: {0}")]
    InvalidVector(String),
    #[error("Embedding dimension mismatch: collection holds {expected}, query has {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Invalid stored value: {0}")]
    InvalidDbValue(String),
    #[error("Metadata error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One row to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub id: String,
    pub document: Document,
    /// Cosine similarity in [-1, 1].
    pub score: f64,
}

pub struct VectorStore {
    conn: Connection,
}

impl VectorStore {
    /// Open the store in `persist_dir`, creating the directory if needed.
    pub fn open(persist_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(persist_dir)?;
        Self::connect(persist_dir)
    }

    /// Open a store that must already exist on disk.
    pub fn open_existing(persist_dir: &Path) -> Result<Self> {
        if !persist_dir.is_dir() {
            return Err(StoreError::NotFound(crate::extract::absolute(persist_dir)));
        }
        Self::connect(persist_dir)
    }

    fn connect(persist_dir: &Path) -> Result<Self> {
        let conn = Connection::open(persist_dir.join(DB_FILE_NAME))?;
        conn.pragma_update(None, "foreign_keys", 1)?;
        conn.execute_batch(SCHEMA_SQL)?;
        tracing::debug!("Opened vector store at {}", persist_dir.display());
        Ok(Self { conn })
    }

    pub fn list_collections(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM collections ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    pub fn has_collection(&self, name: &str) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM collections WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn create_collection(&self, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO collections (name, created_at) VALUES (?1, ?2)",
            params![name, chrono::Utc::now().to_rfc3339()],
        )?;
        tracing::debug!("Created collection {}", name);
        Ok(())
    }

    pub fn get_or_create_collection(&self, name: &str) -> Result<()> {
        if !self.has_collection(name)? {
            self.create_collection(name)?;
        }
        Ok(())
    }

    /// Remove a collection and everything in it.
    pub fn delete_collection(&mut self, name: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM embeddings WHERE collection = ?1", params![name])?;
        let removed = tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        if removed == 0 {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }
        tx.commit()?;
        tracing::debug!("Deleted collection {}", name);
        Ok(())
    }

    /// Insert all records in one transaction; nothing is written if any
    /// record is rejected.
    pub fn add(&mut self, collection: &str, records: &[EmbeddingRecord]) -> Result<usize> {
        if !self.has_collection(collection)? {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO embeddings (id, collection, document, metadata_json, dimension, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in records {
                validate_vector(&record.embedding)?;
                let metadata_json = serde_json::to_string(&record.metadata)?;
                stmt.execute(params![
                    record.id,
                    collection,
                    record.document,
                    metadata_json,
                    dimension_to_i64(record.embedding.len())?,
                    encode_f32_embedding_blob(&record.embedding),
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Added {} records to {}", records.len(), collection);
        Ok(records.len())
    }

    pub fn count(&self, collection: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|_| StoreError::InvalidDbValue(format!("count {count}")))
    }

    pub fn get_ids(&self, collection: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM embeddings WHERE collection = ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![collection], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// The `k` stored documents most similar to `query`, best first.
    ///
    /// Fails with [`StoreError::DimensionMismatch`] when the collection is
    /// non-empty and none of its vectors has the query's dimension.
    pub fn similarity_search_by_vector(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        validate_vector(query)?;

        let stored = self.stored_dimensions(collection)?;
        if !stored.is_empty() && !stored.contains(&query.len()) {
            return Err(StoreError::DimensionMismatch {
                expected: stored[0],
                found: query.len(),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, document, metadata_json, embedding
             FROM embeddings
             WHERE collection = ?1 AND dimension = ?2
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map(
            params![collection, dimension_to_i64(query.len())?],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            },
        )?;

        let mut hits = Vec::new();
        for row in rows {
            let (id, text, metadata_json, blob) = row?;
            let candidate = decode_f32_embedding_blob(&blob, query.len())?;
            let Some(score) = cosine_similarity(query, &candidate) else {
                continue;
            };
            hits.push(ScoredDocument {
                id,
                document: Document {
                    page_content: text,
                    metadata: serde_json::from_str(&metadata_json)?,
                },
                score,
            });
        }

        // Stable sort keeps insertion order among equal scores.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn stored_dimensions(&self, collection: &str) -> Result<Vec<usize>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT dimension FROM embeddings WHERE collection = ?1 ORDER BY dimension",
        )?;
        let dims = stmt
            .query_map(params![collection], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        dims.into_iter()
            .map(|d| {
                usize::try_from(d)
                    .map_err(|_| StoreError::InvalidDbValue(format!("negative dimension {d}")))
            })
            .collect()
    }
}

fn validate_vector(vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(StoreError::InvalidVector("vector is empty".to_string()));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(StoreError::InvalidVector(
            "vector contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

fn dimension_to_i64(len: usize) -> Result<i64> {
    i64::try_from(len).map_err(|_| StoreError::InvalidVector(format!("dimension {len} too large")))
}

fn encode_f32_embedding_blob(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_f32_embedding_blob(blob: &[u8], dimension: usize) -> Result<Vec<f32>> {
    let expected = dimension * std::mem::size_of::<f32>();
    if blob.len() != expected {
        return Err(StoreError::InvalidDbValue(format!(
            "embedding blob is {} bytes, expected {expected}",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    (denom > f64::EPSILON).then(|| dot / denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>, text: &str) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.to_string(),
            embedding,
            document: text.to_string(),
            metadata: BTreeMap::from([("source".to_string(), format!("{id}.txt"))]),
        }
    }

    fn store_with(records: &[EmbeddingRecord]) -> (tempfile::TempDir, VectorStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open(&dir.path().join("db")).unwrap();
        store.create_collection("docs").unwrap();
        store.add("docs", records).unwrap();
        (dir, store)
    }

    #[test]
    fn test_blob_encoding() {
        let v = vec![1.5f32, -0.25, 0.0];
        let blob = encode_f32_embedding_blob(&v);
        assert_eq!(blob.len(), 12);
        assert_eq!(&blob[..4], &1.5f32.to_le_bytes());
        assert_eq!(decode_f32_embedding_blob(&blob, 3).unwrap(), v);
        assert!(decode_f32_embedding_blob(&blob, 2).is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]), Some(1.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), Some(0.0));
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn test_search_orders_by_score_and_truncates() {
        let (_dir, store) = store_with(&[
            record("a", vec![0.0, 1.0], "vertical"),
            record("b", vec![1.0, 0.0], "horizontal"),
            record("c", vec![1.0, 1.0], "diagonal"),
        ]);

        let hits = store.similarity_search_by_vector("docs", &[1.0, 0.1], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.page_content, "horizontal");
        assert_eq!(hits[1].document.page_content, "diagonal");
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].document.source(), Some("b.txt"));
    }

    #[test]
    fn test_search_skips_other_dimensions() {
        let (_dir, store) = store_with(&[
            record("a", vec![1.0, 0.0], "two"),
            record("b", vec![1.0, 0.0, 0.0], "three"),
        ]);
        let hits = store.similarity_search_by_vector("docs", &[1.0, 0.0, 0.0], 4).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.page_content, "three");
    }

    #[test]
    fn test_search_rejects_foreign_dimension() {
        let (_dir, store) = store_with(&[
            record("a", vec![1.0, 0.0, 0.0], "three"),
            record("b", vec![0.0, 1.0, 0.0], "three again"),
        ]);
        let err = store
            .similarity_search_by_vector("docs", &[1.0; 8], 4)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch { expected: 3, found: 8 }
        ));
    }

    #[test]
    fn test_empty_collection_search() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path()).unwrap();
        store.get_or_create_collection("docs").unwrap();
        assert!(store.similarity_search_by_vector("docs", &[1.0], 1).unwrap().is_empty());
    }

    #[test]
    fn test_delete_collection() {
        let (_dir, mut store) = store_with(&[record("a", vec![1.0], "x")]);
        store.delete_collection("docs").unwrap();
        assert!(store.list_collections().unwrap().is_empty());
        assert_eq!(store.count("docs").unwrap(), 0);
        assert!(matches!(
            store.delete_collection("docs"),
            Err(StoreError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_add_is_all_or_nothing() {
        let (_dir, mut store) = store_with(&[]);
        let err = store
            .add(
                "docs",
                &[record("a", vec![1.0], "ok"), record("b", vec![f32::NAN], "bad")],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidVector(_)));
        assert_eq!(store.count("docs").unwrap(), 0);
    }

    #[test]
    fn test_add_requires_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.add("missing", &[record("a", vec![1.0], "x")]),
            Err(StoreError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = VectorStore::open(dir.path()).unwrap();
            store.create_collection("docs").unwrap();
            store.add("docs", &[record("a", vec![0.5, 0.5], "kept")]).unwrap();
        }
        let store = VectorStore::open_existing(dir.path()).unwrap();
        assert_eq!(store.list_collections().unwrap(), vec!["docs"]);
        assert_eq!(store.get_ids("docs").unwrap(), vec!["a"]);
        assert!(dir.path().join(DB_FILE_NAME).exists());
    }

    #[test]
    fn test_open_existing_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("chroma_db");
        assert!(matches!(
            VectorStore::open_existing(&missing),
            Err(StoreError::NotFound(_))
        ));
        assert!(!missing.exists());
    }
}
