//! On-disk shape of the history ledger
//!
//! The ledger file is one JSON object keyed by job title:
//!
//! ```json
//! { "cats": { "pages": { "https://example.com/1": true }, "saves": { "https://example.com/a.jpg": true } } }
//! ```

use crate::storage::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Every job's history, keyed by job title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryDocument {
    pub jobs: BTreeMap<String, JobHistory>,
}

/// Visited pages and saved assets of one job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobHistory {
    #[serde(default)]
    pub pages: BTreeMap<String, bool>,

    #[serde(default)]
    pub saves: BTreeMap<String, bool>,
}

impl JobHistory {
    /// Number of pages recorded as visited
    pub fn page_count(&self) -> usize {
        self.pages.values().filter(|visited| **visited).count()
    }

    /// Number of assets recorded as saved
    pub fn save_count(&self) -> usize {
        self.saves.values().filter(|saved| **saved).count()
    }
}

/// Reads the ledger, creating an empty file first if none exists
pub fn open_document(path: &Path) -> Result<HistoryDocument, LedgerError> {
    if !path.exists() {
        if let Some(parent) = parent_dir(path) {
            fs::create_dir_all(&parent)?;
        }
        fs::File::create(path)?;
        tracing::info!("Created empty history ledger at {}", path.display());
        return Ok(HistoryDocument::default());
    }
    read_document(path)
}

/// Reads the ledger without creating it
///
/// An empty or whitespace-only file is an empty document.
pub fn read_document(path: &Path) -> Result<HistoryDocument, LedgerError> {
    let content = fs::read_to_string(path)?;
    let content = content.trim();
    if content.is_empty() {
        return Ok(HistoryDocument::default());
    }

    serde_json::from_str(content).map_err(|source| LedgerError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Replaces the ledger file with `content` via a temp file and rename
pub fn write_document(path: &Path, content: &str) -> Result<(), LedgerError> {
    let dir = parent_dir(path).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| LedgerError::Io(e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}
