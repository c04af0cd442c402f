//! Blog-Sync main entry point
//!
//! This is the command-line interface for the Blog-Sync site archiver.

use anyhow::Context;
use blog_sync::config::{build_config, ledger_path, ConfigOverrides};
use blog_sync::crawler::crawl;
use blog_sync::output::{load_statistics, print_statistics};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Blog-Sync: a polite paginating site archiver
///
/// Blog-Sync follows "next page" links from a home page, saves the images
/// and files each page links to, and remembers what it has seen so later
/// runs only fetch what is new.
#[derive(Parser, Debug)]
#[command(name = "blog-sync")]
#[command(version = "1.0.0")]
#[command(about = "A polite paginating site archiver", long_about = None)]
struct Cli {
    /// TOML job file; command-line options override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Home URL the crawl starts from
    #[arg(long, value_name = "URL")]
    home: Option<String>,

    /// Output folder (default: current directory)
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Selector for the first page link on the home page
    #[arg(long, value_name = "SELECTOR")]
    page_pattern: Option<String>,

    /// Selector for the next page link
    #[arg(long, value_name = "SELECTOR")]
    next_pattern: Option<String>,

    /// Next page URL template containing {PAGE}
    #[arg(long, value_name = "TEMPLATE")]
    pager_url: Option<String>,

    /// Comma-separated selectors for assets and sub-pages to save
    #[arg(long, value_name = "SELECTORS")]
    save_pattern: Option<String>,

    /// Comma-separated query parameters ignored when comparing URLs
    #[arg(long, value_name = "PARAMS")]
    ignore_query: Option<String>,

    /// Selector for the page title
    #[arg(long, value_name = "SELECTOR")]
    title_pattern: Option<String>,

    /// Regex the next link text must match (case-insensitive)
    #[arg(long, value_name = "REGEX")]
    next_filter_pattern: Option<String>,

    /// Regex whose first group is the page number for --pager-url
    #[arg(long, value_name = "REGEX")]
    pager_page_pattern: Option<String>,

    /// History ledger file (default: data.txt)
    #[arg(long, value_name = "FILE")]
    data_file: Option<PathBuf>,

    /// Sleep up to this many seconds before each page request
    #[arg(long, value_name = "SECONDS")]
    sleep: Option<u64>,

    /// Stop at the first page seen in an earlier run
    #[arg(long)]
    stop_early: bool,

    /// Skip pages seen in an earlier run
    #[arg(long)]
    no_revisit: bool,

    /// Save assets into one folder per page title
    #[arg(long)]
    folderize: bool,

    /// Start from an empty history and never write the ledger
    #[arg(long)]
    ignore_history: bool,

    /// Also save each page's HTML
    #[arg(long)]
    save_page: bool,

    /// Name folders after the URL path instead of the page title
    #[arg(long)]
    folder_uses_pathname: bool,

    /// Fail pages whose host or path changes through a redirect
    #[arg(long)]
    no_redirect: bool,

    /// Record history without saving any file
    #[arg(long)]
    update_data_only: bool,

    /// Cookie forwarded from page responses to asset requests
    #[arg(long, value_name = "NAME")]
    session_cookie: Option<String>,

    /// User agent sent with every request
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show per-job counts from the history ledger and exit
    #[arg(long)]
    stats: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            home: self.home.clone(),
            out: self.out.clone(),
            data_file: self.data_file.clone(),
            page_pattern: self.page_pattern.clone(),
            next_pattern: self.next_pattern.clone(),
            pager_url: self.pager_url.clone(),
            save_pattern: self.save_pattern.clone(),
            ignore_query: self.ignore_query.clone(),
            title_pattern: self.title_pattern.clone(),
            next_filter_pattern: self.next_filter_pattern.clone(),
            pager_page_pattern: self.pager_page_pattern.clone(),
            sleep: self.sleep,
            user_agent: self.user_agent.clone(),
            session_cookie: self.session_cookie.clone(),
            stop_early: self.stop_early,
            no_revisit: self.no_revisit,
            folderize: self.folderize,
            ignore_history: self.ignore_history,
            save_page: self.save_page,
            folder_uses_pathname: self.folder_uses_pathname,
            no_redirect: self.no_redirect,
            update_data_only: self.update_data_only,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if cli.stats {
        return handle_stats(&cli);
    }

    handle_crawl(&cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("blog_sync=info,warn"),
            1 => EnvFilter::new("blog_sync=debug,info"),
            2 => EnvFilter::new("blog_sync=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows ledger counts without touching the file
fn handle_stats(cli: &Cli) -> anyhow::Result<()> {
    let path = ledger_path(cli.config.as_deref(), cli.data_file.clone())
        .context("Failed to resolve the history ledger")?;

    println!("Ledger: {}\n", path.display());
    let stats = load_statistics(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli) -> anyhow::Result<()> {
    if let Some(path) = cli.config.as_deref() {
        tracing::info!("Loading configuration from: {}", path.display());
    }

    let config = match build_config(cli.config.as_deref(), cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!(
        "Crawling {} into {}",
        config.job.home,
        config.out_dir().display()
    );

    match crawl(config).await {
        Ok(summary) => {
            tracing::debug!("{:?}", summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
