use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Desktop browser identity used for page and asset requests
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) AppleWebKit/601.7.7 (KHTML, like Gecko) Version/9.1.2 Safari/601.7.7";

/// Main configuration structure for Blog-Sync
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// What to crawl and where to put it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobConfig {
    /// Seed page of the crawl
    #[serde(default)]
    pub home: String,

    /// Output root for downloaded assets and saved pages
    #[serde(default)]
    pub out: Option<PathBuf>,

    /// JSON history ledger shared by all jobs
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            home: String::new(),
            out: None,
            data_file: default_data_file(),
        }
    }
}

/// Selectors and patterns that drive traversal
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatternConfig {
    /// Selector on the home page whose first anchor is the first page
    pub page_pattern: Option<String>,

    /// Selector for "next page" anchors
    pub next_pattern: Option<String>,

    /// URL template with a `{PAGE}` placeholder
    pub pager_url: Option<String>,

    /// Comma-separated selectors for savable links and images
    pub save_pattern: Option<String>,

    /// Selector whose first match names the page
    pub title_pattern: Option<String>,

    /// Regex a next anchor's text must match
    pub next_filter_pattern: Option<String>,

    /// Regex whose first capture on a next anchor's markup is the page number
    pub pager_page_pattern: Option<String>,

    /// Query parameters that never distinguish two URLs
    #[serde(default)]
    pub ignore_query: Vec<String>,
}

/// Switches controlling revisit, folder and persistence policy
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BehaviorConfig {
    /// Stop the whole run at the first already-visited page
    #[serde(default)]
    pub stop_early: bool,

    /// Never fetch a page recorded in the ledger
    #[serde(default)]
    pub no_revisit: bool,

    /// Save assets into one folder per page title
    #[serde(default)]
    pub folderize: bool,

    /// Start from an empty ledger and never write it
    #[serde(default)]
    pub ignore_history: bool,

    /// Save each rendered page as HTML
    #[serde(default)]
    pub save_page: bool,

    /// Derive folder names from the URL path even when a title selector is set
    #[serde(default)]
    pub folder_uses_pathname: bool,

    /// Treat a redirect to another host or path as a failure
    #[serde(default)]
    pub no_redirect: bool,

    /// Rebuild the ledger without transferring anything
    #[serde(default)]
    pub update_data_only: bool,

    /// Upper bound of the random delay before each page fetch (seconds)
    #[serde(default)]
    pub sleep: u64,

    /// Idle time before a ledger change is written to disk (milliseconds)
    #[serde(default = "default_flush_delay_ms")]
    pub flush_delay_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            stop_early: false,
            no_revisit: false,
            folderize: false,
            ignore_history: false,
            save_page: false,
            folder_uses_pathname: false,
            no_redirect: false,
            update_data_only: false,
            sleep: 0,
            flush_delay_ms: default_flush_delay_ms(),
        }
    }
}

/// File extensions that mark a link or image as a downloadable asset
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssetConfig {
    #[serde(default = "default_link_extensions")]
    pub link_extensions: Vec<String>,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            link_extensions: default_link_extensions(),
            image_extensions: default_image_extensions(),
        }
    }
}

/// HTTP identity and session forwarding
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Cookie forwarded from the page response to asset requests
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            session_cookie: default_session_cookie(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Output root, defaulting to the working directory
    pub fn out_dir(&self) -> PathBuf {
        self.job.out.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Job title keying this crawl's history in the ledger
    ///
    /// The basename of the output folder, or of the home URL path when no
    /// output folder is configured. A bare site root falls back to the host.
    pub fn job_title(&self) -> String {
        let from_out = self
            .job
            .out
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|title| !title.is_empty());
        if let Some(title) = from_out {
            return title;
        }

        let Ok(home) = ::url::Url::parse(&self.job.home) else {
            return String::new();
        };
        home.path()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .or_else(|| home.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data.txt")
}

fn default_flush_delay_ms() -> u64 {
    1000
}

fn default_link_extensions() -> Vec<String> {
    ["gif", "jpg", "jpeg", "png", "bmp", "pdf"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_image_extensions() -> Vec<String> {
    let mut extensions = default_link_extensions();
    extensions.push("php".to_string());
    extensions
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_session_cookie() -> String {
    "PHPSESSID".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
