//! Crawler module for walking a blog and collecting its assets
//!
//! This module contains the core crawling logic, including:
//! - Page rendering over HTTP with redirect rejection
//! - Title, asset and next-page extraction
//! - The politeness delay between requests
//! - The depth-first fetch engine and its hooks
//! - Overall run coordination

mod coordinator;
mod engine;
mod fetcher;
mod parser;
mod scheduler;
mod traverse;

pub use coordinator::{run_crawl, Coordinator};
pub use engine::{
    AssetReference, CrawlHooks, EngineReport, FetchEngine, FetchRequest, PageSnapshot,
    MAX_RENDER_ATTEMPTS,
};
pub use fetcher::{build_http_client, HttpRenderer, PageRenderer, RenderedPage};
pub use parser::{collapse_title, extract_page, first_link, ExtractRules, PageExtract, PagerTemplate, SaveTarget};
pub use scheduler::Throttle;
pub use traverse::traverse;

use crate::config::Config;
use crate::output::RunSummary;
use crate::SyncError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the history ledger
/// 2. Build the HTTP client
/// 3. Find the first page
/// 4. Fetch pages, saving assets and following next links
/// 5. Flush the ledger and report a summary
///
/// # Arguments
///
/// * `config` - The validated job configuration
///
/// # Returns
///
/// * `Ok(RunSummary)` - Crawl completed successfully
/// * `Err(SyncError)` - Crawl failed
pub async fn crawl(config: Config) -> Result<RunSummary, SyncError> {
    run_crawl(config).await
}
