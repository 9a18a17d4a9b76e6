//! Crate-level error and file discovery shared by the pipelines.

use std::path::{Path, PathBuf};

use crate::extract::ExtractError;
use crate::index::IndexError;
use crate::report::ReportError;

#[derive(Debug, thiserror::Error)]
pub enum BoardRagError {
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

const MAX_DEPTH: usize = 20;

/// Recursively collect files with the given extension, sorted by path.
///
/// Hidden directories and common build output directories are skipped.
pub fn discover_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_dir(dir, extension, &mut files, 0)?;
    files.sort();
    Ok(files)
}

fn walk_dir(
    dir: &Path,
    extension: &str,
    files: &mut Vec<PathBuf>,
    depth: usize,
) -> std::io::Result<()> {
    if depth > MAX_DEPTH {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "target" || name == "node_modules" {
                continue;
            }
            walk_dir(&path, extension, files, depth + 1)?;
        } else if path.is_file()
            && path.extension().and_then(|s| s.to_str()) == Some(extension)
        {
            files.push(path);
        }
    }
    Ok(())
}
