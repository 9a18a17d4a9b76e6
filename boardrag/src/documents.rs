//! Plain-text document loading.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::discover_files;

pub const SOURCE_KEY: &str = "source";

/// A unit of text plus string metadata; both whole files and chunks use it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// Load every `*.txt` file under `dir` (recursively, in path order).
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn load_text_documents(dir: &Path) -> std::io::Result<Vec<Document>> {
    let mut documents = Vec::new();
    for path in discover_files(dir, "txt")? {
        let bytes = std::fs::read(&path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        tracing::debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
        documents.push(Document::new(text).with_metadata(SOURCE_KEY, path.display().to_string()));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_text_documents_sets_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rules.txt"), "Trace width >= 0.15 mm").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let docs = load_text_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].page_content, "Trace width >= 0.15 mm");
        assert!(docs[0].source().unwrap().ends_with("rules.txt"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.txt"), [b'o', b'k', 0xff]).unwrap();

        let docs = load_text_documents(dir.path()).unwrap();
        assert_eq!(docs[0].page_content, "ok\u{fffd}");
    }
}
