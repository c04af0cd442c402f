//! Run summaries and ledger statistics
//!
//! This module provides functionality for summarizing a finished run and
//! for displaying what the history ledger holds per job.

use crate::crawler::EngineReport;
use crate::storage::{read_document, HistoryDocument, LedgerResult};
use std::path::Path;
use std::time::Duration;

/// Outcome counters of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Counters reported by the fetch engine
    pub engine: EngineReport,

    /// Assets written to disk
    pub assets_saved: u64,

    /// Assets resolved but not written (dry-run)
    pub assets_dry_run: u64,

    /// Assets skipped because the ledger already had them
    pub assets_known: u64,

    /// Assets whose download failed
    pub asset_failures: u64,

    /// Rendered pages saved as HTML
    pub pages_saved: u64,

    /// Set when revisit prevention stopped the run early
    pub stopped_early: bool,

    pub elapsed: Duration,
}

impl RunSummary {
    /// Logs the summary at info level
    pub fn log(&self) {
        tracing::info!(
            "Run finished in {:?}: {} pages rendered, {} declined, {} failed",
            self.elapsed,
            self.engine.pages_rendered,
            self.engine.pages_declined,
            self.engine.render_failures + self.engine.malformed_abandoned
        );
        tracing::info!(
            "Assets: {} saved, {} already saved, {} skipped (dry-run), {} failed",
            self.assets_saved,
            self.assets_known,
            self.assets_dry_run,
            self.asset_failures
        );
        if self.pages_saved > 0 {
            tracing::info!("Pages saved: {}", self.pages_saved);
        }
        if self.stopped_early {
            tracing::info!("Stopped early at a previously visited page");
        }
    }
}

/// Per-job counts held in the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatistics {
    pub job: String,
    pub pages: usize,
    pub saves: usize,
}

/// Ledger statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStatistics {
    /// Jobs in ledger order (sorted by title)
    pub jobs: Vec<JobStatistics>,
}

impl LedgerStatistics {
    pub fn from_document(document: &HistoryDocument) -> Self {
        let jobs = document
            .jobs
            .iter()
            .map(|(job, history)| JobStatistics {
                job: job.clone(),
                pages: history.page_count(),
                saves: history.save_count(),
            })
            .collect();
        Self { jobs }
    }

    pub fn total_pages(&self) -> usize {
        self.jobs.iter().map(|j| j.pages).sum()
    }

    pub fn total_saves(&self) -> usize {
        self.jobs.iter().map(|j| j.saves).sum()
    }
}

/// Loads statistics from a ledger file without modifying it
///
/// # Returns
///
/// * `Ok(LedgerStatistics)` - Counts per job (empty for a missing file)
/// * `Err(LedgerError)` - The file exists but cannot be read or parsed
pub fn load_statistics(path: &Path) -> LedgerResult<LedgerStatistics> {
    if !path.exists() {
        return Ok(LedgerStatistics::default());
    }
    let document = read_document(path)?;
    Ok(LedgerStatistics::from_document(&document))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== History Ledger ===\n");

    let jobs = &stats.jobs;
    if jobs.is_empty() {
        println!("No jobs recorded");
        return;
    }

    let width = jobs.iter().map(|j| j.job.len()).max().unwrap_or(0).max(3);
    println!("  {:<width$}  {:>8}  {:>8}", "Job", "Pages", "Saves", width = width);
    for entry in jobs {
        println!(
            "  {:<width$}  {:>8}  {:>8}",
            entry.job,
            entry.pages,
            entry.saves,
            width = width
        );
    }

    if jobs.len() > 1 {
        println!();
        println!(
            "Total: {} pages, {} saves across {} jobs",
            stats.total_pages(),
            stats.total_saves(),
            jobs.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_statistics_from_ledger_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(
            &path,
            r#"{"cats":{"pages":{"a":true,"b":true},"saves":{"x":true}},
                "dogs":{"pages":{},"saves":{"y":true,"z":true}}}"#,
        )
        .unwrap();

        let stats = load_statistics(&path).unwrap();
        assert_eq!(
            stats.jobs,
            vec![
                JobStatistics {
                    job: "cats".to_string(),
                    pages: 2,
                    saves: 1
                },
                JobStatistics {
                    job: "dogs".to_string(),
                    pages: 0,
                    saves: 2
                },
            ]
        );
        assert_eq!(stats.total_pages(), 2);
        assert_eq!(stats.total_saves(), 3);
    }

    #[test]
    fn test_missing_ledger_has_no_jobs() {
        let dir = TempDir::new().unwrap();
        let stats = load_statistics(&dir.path().join("absent.txt")).unwrap();
        assert!(stats.jobs.is_empty());
        assert!(!dir.path().join("absent.txt").exists());
    }
}
