//! History ledger for crawl jobs
//!
//! This module handles:
//! - Loading the JSON ledger at startup (creating it when absent)
//! - The per-job `pages` and `saves` sets used for revisit prevention
//!   and download de-duplication
//! - Debounced, coalesced writes after every mutation
//! - A final synchronous flush before exit

mod document;
mod flush;

pub use document::{open_document, read_document, write_document, HistoryDocument, JobHistory};
pub use flush::DebouncedFlush;

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while reading or writing the ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt history ledger {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// In-memory ledger of one job, backed by the shared JSON file
///
/// Reads always reflect every prior mutation. The file catches up after the
/// debounce delay, or immediately on [`Ledger::flush`].
pub struct Ledger {
    document: HistoryDocument,
    job: String,
    flusher: Option<DebouncedFlush>,
}

impl Ledger {
    /// Opens the ledger file and selects the history of `job`
    ///
    /// # Arguments
    ///
    /// * `path` - Ledger file, created empty if absent
    /// * `job` - Job title keying this crawl's history
    /// * `ignore_history` - Start from an empty history and never write the file
    /// * `flush_delay` - Idle time before a mutation is written
    pub fn open(
        path: &Path,
        job: &str,
        ignore_history: bool,
        flush_delay: Duration,
    ) -> LedgerResult<Self> {
        let mut document = open_document(path)?;

        let flusher = if ignore_history {
            tracing::info!("Ignoring history in {}", path.display());
            document = HistoryDocument::default();
            None
        } else {
            Some(DebouncedFlush::new(path.to_path_buf(), flush_delay))
        };

        document.jobs.entry(job.to_string()).or_default();

        Ok(Self {
            document,
            job: job.to_string(),
            flusher,
        })
    }

    /// Creates a ledger that lives only in memory
    pub fn in_memory(job: &str) -> Self {
        let mut document = HistoryDocument::default();
        document.jobs.entry(job.to_string()).or_default();
        Self {
            document,
            job: job.to_string(),
            flusher: None,
        }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    /// History of the selected job
    pub fn history(&self) -> &JobHistory {
        // The job entry is inserted on construction and never removed.
        &self.document.jobs[&self.job]
    }

    pub fn document(&self) -> &HistoryDocument {
        &self.document
    }

    /// Returns true if the page was visited by this or an earlier run
    pub fn has_page(&self, url: &str) -> bool {
        self.history().pages.get(url).copied().unwrap_or(false)
    }

    /// Records a visited page, returning true if it was not recorded before
    pub fn record_page(&mut self, url: &str) -> bool {
        let inserted = self.history_mut().pages.insert(url.to_string(), true) != Some(true);
        self.mark_dirty();
        inserted
    }

    /// Returns true if the asset was saved by this or an earlier run
    pub fn has_save(&self, url: &str) -> bool {
        self.history().saves.get(url).copied().unwrap_or(false)
    }

    /// Records a saved asset, returning true if it was not recorded before
    pub fn record_save(&mut self, url: &str) -> bool {
        let inserted = self.history_mut().saves.insert(url.to_string(), true) != Some(true);
        self.mark_dirty();
        inserted
    }

    /// Returns true if mutations are written back to disk
    pub fn is_persistent(&self) -> bool {
        self.flusher.is_some()
    }

    /// Schedules a debounced write of the whole document
    pub fn mark_dirty(&mut self) {
        let Some(flusher) = self.flusher.as_mut() else {
            return;
        };
        match serde_json::to_string(&self.document) {
            Ok(snapshot) => flusher.mark_dirty(snapshot),
            Err(e) => tracing::error!("Failed to serialize history ledger: {}", e),
        }
    }

    /// Writes any pending change synchronously
    pub fn flush(&mut self) -> LedgerResult<()> {
        match self.flusher.as_mut() {
            Some(flusher) => flusher.flush(),
            None => Ok(()),
        }
    }

    fn history_mut(&mut self) -> &mut JobHistory {
        self.document.jobs.entry(self.job.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_job_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");

        let ledger = Ledger::open(&path, "cats", false, Duration::from_millis(10)).unwrap();
        assert_eq!(ledger.job(), "cats");
        assert!(ledger.history().pages.is_empty());
        assert!(ledger.is_persistent());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_record_and_flush_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");

        let mut ledger = Ledger::open(&path, "cats", false, Duration::from_secs(60)).unwrap();
        assert!(ledger.record_page("http://x/index"));
        assert!(!ledger.record_page("http://x/index"));
        assert!(ledger.record_save("http://x/img/a.jpg"));
        assert!(ledger.has_page("http://x/index"));
        assert!(ledger.has_save("http://x/img/a.jpg"));
        assert!(!ledger.has_save("http://x/img/b.jpg"));

        ledger.flush().unwrap();

        let reopened = Ledger::open(&path, "cats", false, Duration::from_secs(60)).unwrap();
        assert!(reopened.has_page("http://x/index"));
        assert!(reopened.has_save("http://x/img/a.jpg"));
    }

    #[tokio::test]
    async fn test_other_jobs_are_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, r#"{"dogs":{"pages":{"http://d/1":true},"saves":{}}}"#).unwrap();

        let mut ledger = Ledger::open(&path, "cats", false, Duration::from_secs(60)).unwrap();
        ledger.record_page("http://c/1");
        ledger.flush().unwrap();

        let document = read_document(&path).unwrap();
        assert!(document.jobs["dogs"].pages.contains_key("http://d/1"));
        assert!(document.jobs["cats"].pages.contains_key("http://c/1"));
    }

    #[tokio::test]
    async fn test_ignore_history_starts_empty_and_never_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");
        let original = r#"{"cats":{"pages":{"http://x/1":true},"saves":{}}}"#;
        fs::write(&path, original).unwrap();

        let mut ledger = Ledger::open(&path, "cats", true, Duration::from_millis(10)).unwrap();
        assert!(!ledger.has_page("http://x/1"));
        assert!(!ledger.is_persistent());

        ledger.record_page("http://x/2");
        ledger.flush().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_debounced_write_lands_without_flush() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");

        let mut ledger = Ledger::open(&path, "cats", false, Duration::from_millis(20)).unwrap();
        ledger.record_save("http://x/a.jpg");
        tokio::time::sleep(Duration::from_millis(300)).await;

        let document = read_document(&path).unwrap();
        assert!(document.jobs["cats"].saves.contains_key("http://x/a.jpg"));
    }
}
