//! Crawler coordinator - run orchestration
//!
//! This module wires configuration, the history ledger and the download
//! manager into the fetch engine:
//! - Deciding which pages are fetched (revisit prevention, stop-early)
//! - Saving assets into the output folder and recording them
//! - Saving rendered pages as HTML
//! - Flushing the ledger on exit and on Ctrl-C

use crate::config::Config;
use crate::crawler::engine::{AssetReference, CrawlHooks, EngineReport, FetchEngine, PageSnapshot};
use crate::crawler::fetcher::{build_http_client, HttpRenderer, PageRenderer};
use crate::crawler::parser::ExtractRules;
use crate::crawler::scheduler::Throttle;
use crate::crawler::traverse::traverse;
use crate::download::Downloader;
use crate::output::{asset_file_name, folder_name, PageSink, RunSummary};
use crate::storage::Ledger;
use crate::url::{file_name, fix_url};
use crate::{ConfigError, SyncError};
use async_trait::async_trait;
use scraper::Selector;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use url::Url;

/// Main crawler coordinator structure
///
/// Owns the ledger for the whole run; the engine reaches it only through
/// the [`CrawlHooks`] implementation.
pub struct Coordinator {
    config: Config,
    ledger: Ledger,
    downloader: Downloader,
    page_sink: PageSink,
    home: Url,
    home_pending: bool,
    stopped: bool,
    summary: RunSummary,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// The normalized home URL is recorded as visited right away.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated job configuration
    /// * `ledger` - History of the job
    /// * `downloader` - Asset transfer backend
    pub fn new(config: Config, mut ledger: Ledger, downloader: Downloader) -> Result<Self, SyncError> {
        let home = fix_url(&config.job.home, &config.patterns.ignore_query)?;
        ledger.record_page(home.as_str());

        let page_sink = PageSink::new(config.behavior.update_data_only);

        Ok(Self {
            config,
            ledger,
            downloader,
            page_sink,
            home,
            home_pending: false,
            stopped: false,
            summary: RunSummary::default(),
        })
    }

    pub fn home(&self) -> &Url {
        &self.home
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Returns true once revisit prevention has stopped the run
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Resolves the first page and walks the site from it
    ///
    /// # Arguments
    ///
    /// * `engine` - The fetch engine to drive
    /// * `page_selector` - Selector locating the first page on the home page
    pub async fn run<R: PageRenderer>(
        &mut self,
        engine: &FetchEngine<R>,
        page_selector: Option<&Selector>,
    ) -> EngineReport {
        let home = self.home.clone();
        let Some(first) = traverse(engine.renderer(), &home, page_selector).await else {
            return EngineReport::default();
        };

        let first = match fix_url(first.as_str(), &self.config.patterns.ignore_query) {
            Ok(first) => first,
            Err(e) => {
                tracing::warn!("Unusable first page {}: {}", first, e);
                return EngineReport::default();
            }
        };

        self.home_pending = first == home;
        engine.run(&first, self).await
    }

    /// Flushes the ledger and returns the final summary
    pub fn finish(&mut self, report: EngineReport, elapsed: Duration) -> Result<RunSummary, SyncError> {
        self.ledger.flush()?;
        self.summary.engine = report;
        self.summary.elapsed = elapsed;
        self.summary.stopped_early = self.stopped;
        Ok(self.summary.clone())
    }

    /// Folder assets and pages with this title are saved into, created on demand
    async fn output_folder(&self, title: &str) -> std::io::Result<PathBuf> {
        let root = self.config.out_dir();
        let folder = if self.config.behavior.folderize {
            root.join(folder_name(title))
        } else {
            root
        };
        tokio::fs::create_dir_all(&folder).await?;
        Ok(folder)
    }
}

#[async_trait]
impl CrawlHooks for Coordinator {
    fn should_fetch(&mut self, url: &Url) -> bool {
        if *url == self.home {
            if self.home_pending {
                self.home_pending = false;
                return true;
            }
            tracing::debug!("Home page reached again, not revisiting: {}", url);
            return false;
        }

        let behavior = &self.config.behavior;
        if behavior.stop_early && self.stopped {
            return false;
        }

        if (behavior.no_revisit || behavior.stop_early) && self.ledger.has_page(url.as_str()) {
            self.stopped = true;
            if behavior.stop_early {
                tracing::info!("Stopping at previously visited page {}", url);
            } else {
                tracing::info!("Already visited, skipping {}", url);
            }
            return false;
        }

        self.ledger.record_page(url.as_str());
        true
    }

    async fn on_asset(&mut self, asset: AssetReference) {
        let key = match fix_url(asset.url.as_str(), &self.config.patterns.ignore_query) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Skipping asset {}: {}", asset.url, e);
                return;
            }
        };

        if self.ledger.has_save(key.as_str()) {
            tracing::debug!("Already saved: {}", key);
            self.summary.assets_known += 1;
            return;
        }

        let Some(name) = file_name(&asset.url).and_then(|segment| asset_file_name(&segment)) else {
            tracing::warn!("No file name in asset URL {}", asset.url);
            return;
        };

        let folder = match self.output_folder(&asset.folder_title).await {
            Ok(folder) => folder,
            Err(e) => {
                tracing::error!("Failed to create folder for '{}': {}", asset.folder_title, e);
                self.summary.asset_failures += 1;
                return;
            }
        };

        let dest = folder.join(name);
        match self.downloader.download(&asset.url, &dest, &asset.headers).await {
            Ok(outcome) => {
                if outcome.persisted {
                    tracing::info!("Saved {} -> {}", asset.url, outcome.path.display());
                    self.summary.assets_saved += 1;
                } else {
                    tracing::info!("Skipped save {} -> {}", asset.url, outcome.path.display());
                    self.summary.assets_dry_run += 1;
                }
                self.ledger.record_save(key.as_str());
            }
            Err(e) => {
                tracing::warn!("Failed to save {}: {}", asset.url, e);
                self.summary.asset_failures += 1;
            }
        }
    }

    async fn on_page_rendered(&mut self, page: PageSnapshot) {
        if !self.config.behavior.save_page {
            return;
        }

        let folder = match self.output_folder(&page.folder_title).await {
            Ok(folder) => folder,
            Err(e) => {
                tracing::error!("Failed to create folder for '{}': {}", page.folder_title, e);
                return;
            }
        };

        match self.page_sink.save(&folder, &page.page_title, &page.markup).await {
            Ok(Some(_)) => self.summary.pages_saved += 1,
            Ok(None) => self.ledger.mark_dirty(),
            Err(e) => tracing::warn!("Failed to save page {}: {}", page.url, e),
        }
    }
}

/// Runs the main crawl operation
///
/// This function orchestrates the entire run:
///
/// 1. Open the history ledger of the job
/// 2. Build the HTTP client, renderer and downloader
/// 3. Resolve the first page from the home page
/// 4. Walk the site, saving assets and pages
/// 5. Flush the ledger (also on Ctrl-C)
/// 6. Log a run summary
///
/// # Arguments
///
/// * `config` - The validated job configuration
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run finished or was interrupted cleanly
/// * `Err(SyncError)` - Setup failed, or the final ledger flush failed
///
/// # Example
///
/// ```no_run
/// use blog_sync::config::load_config;
/// use blog_sync::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("job.toml"))?;
/// run_crawl(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<RunSummary, SyncError> {
    let start = Instant::now();

    let job = config.job_title();
    tracing::info!("Job '{}', history in {}", job, config.job.data_file.display());
    let ledger = Ledger::open(
        &config.job.data_file,
        &job,
        config.behavior.ignore_history,
        Duration::from_millis(config.behavior.flush_delay_ms),
    )?;

    let rules = ExtractRules::from_config(&config)?;
    let page_selector = config
        .patterns
        .page_pattern
        .as_deref()
        .map(|pattern| {
            Selector::parse(pattern).map_err(|e| {
                ConfigError::InvalidPattern(format!("page-pattern '{}': {:?}", pattern, e))
            })
        })
        .transpose()?;

    let client = build_http_client(&config.http)?;
    let renderer = HttpRenderer::new(
        client.clone(),
        config.behavior.no_redirect,
        config.http.session_cookie.clone(),
    );
    let downloader = Downloader::new(client, config.behavior.update_data_only);
    let engine = FetchEngine::new(
        renderer,
        rules,
        config.patterns.ignore_query.clone(),
        Throttle::new(config.behavior.sleep),
    );

    if config.behavior.update_data_only {
        tracing::info!("Updating history only, nothing will be saved");
    }

    let mut coordinator = Coordinator::new(config, ledger, downloader)?;

    let report = {
        let run = coordinator.run(&engine, page_selector.as_ref());
        tokio::pin!(run);

        let mut signal_failed = false;
        let finished = tokio::select! {
            report = &mut run => Some(report),
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!("Unable to listen for Ctrl-C: {}", e);
                    signal_failed = true;
                }
                None
            }
        };

        match finished {
            Some(report) => report,
            None if signal_failed => run.await,
            None => {
                tracing::warn!("Interrupted, saving history");
                EngineReport::default()
            }
        }
    };

    let summary = coordinator.finish(report, start.elapsed())?;
    summary.log();
    Ok(summary)
}
