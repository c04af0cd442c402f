//! Download manager for page assets
//!
//! This module performs single binary transfers, including:
//! - Refusing destinations that are directories
//! - Never clobbering an existing file (random collision tokens)
//! - Streaming the body into a part file moved into place once complete
//! - Stamping the file with the remote Last-Modified time
//! - Repairing the extension from the response Content-Type
//! - A dry-run mode that resolves names but transfers nothing

mod naming;

pub use naming::{extension_for_content_type, is_media_path, repaired_path, unique_path};

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE, LAST_MODIFIED, REFERER};
use reqwest::Client;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Attempts at finding a free collision-token name before giving up
const MAX_NAME_ATTEMPTS: usize = 5;

/// Errors that can occur during a download
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download destination is a directory: {0}")]
    DestinationIsDirectory(PathBuf),

    #[error("File stat error for {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Transfer of {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Headers forwarded with an asset request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetHeaders {
    /// The page the asset was found on
    pub referer: Option<String>,

    /// `name=value` session cookie taken from the page response
    pub cookie: Option<String>,
}

impl AssetHeaders {
    fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(referer) = self.referer.as_deref() {
            if let Ok(value) = HeaderValue::from_str(referer) {
                headers.insert(REFERER, value);
            }
        }
        if let Some(cookie) = self.cookie.as_deref() {
            if let Ok(value) = HeaderValue::from_str(cookie) {
                headers.insert(COOKIE, value);
            }
        }
        headers
    }
}

/// Result of a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Final location of the file (after collision and extension handling)
    pub path: PathBuf,

    /// False when the transfer was skipped in dry-run mode
    pub persisted: bool,
}

/// Performs asset transfers with a shared HTTP client
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    dry_run: bool,
}

impl Downloader {
    /// Creates a downloader
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for every transfer
    /// * `dry_run` - Resolve destinations but skip the transfer
    pub fn new(client: Client, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    /// Downloads `source` to `dest`
    ///
    /// # Returns
    ///
    /// * `Ok(DownloadOutcome)` - Final path, and whether anything was written
    /// * `Err(DownloadError)` - Nothing is left behind on disk
    pub async fn download(
        &self,
        source: &Url,
        dest: &Path,
        headers: &AssetHeaders,
    ) -> Result<DownloadOutcome, DownloadError> {
        let mut dest = dest.to_path_buf();

        match fs::metadata(&dest).await {
            Ok(meta) if meta.is_dir() => {
                return Err(DownloadError::DestinationIsDirectory(dest));
            }
            Ok(_) => dest = unique_path(&dest),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(DownloadError::Stat { path: dest, source }),
        }

        if self.dry_run {
            return Ok(DownloadOutcome {
                path: dest,
                persisted: false,
            });
        }

        let response = self
            .client
            .get(source.clone())
            .headers(headers.to_header_map())
            .send()
            .await
            .map_err(|e| DownloadError::Transport {
                url: source.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: source.to_string(),
                status: status.as_u16(),
            });
        }

        let modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date)
            .unwrap_or_else(SystemTime::now);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let part = Builder::new()
            .prefix(".blog-sync-")
            .suffix(".part")
            .tempfile_in(parent_dir(&dest))?;
        let mut file = File::from_std(part.as_file().try_clone()?);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| DownloadError::Transport {
                url: source.to_string(),
                source: e,
            })?;
            file.write_all(&bytes).await?;
        }
        file.flush().await?;
        drop(file);

        let dest = finish_file(part, dest, modified).await?;
        let path = match content_type.as_deref() {
            Some(content_type) => repair_extension(dest, content_type).await,
            None => dest,
        };

        Ok(DownloadOutcome {
            path,
            persisted: true,
        })
    }
}

/// Stamps the finished part file and moves it to `dest`
///
/// An existing file is never replaced; a name taken meanwhile gets a fresh
/// collision token.
async fn finish_file(
    part: NamedTempFile,
    dest: PathBuf,
    modified: SystemTime,
) -> Result<PathBuf, DownloadError> {
    tokio::task::spawn_blocking(move || -> Result<PathBuf, DownloadError> {
        part.as_file().sync_all()?;
        part.as_file().set_modified(modified)?;

        let mut part = part;
        let mut dest = dest;
        for _ in 0..MAX_NAME_ATTEMPTS {
            match part.persist_noclobber(&dest) {
                Ok(_) => return Ok(dest),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    part = e.file;
                    dest = unique_path(&dest);
                }
                Err(e) => return Err(DownloadError::Io(e.error)),
            }
        }
        Err(DownloadError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free file name near {}", dest.display()),
        )))
    })
    .await
    .map_err(|e| DownloadError::Io(std::io::Error::new(ErrorKind::Other, e)))?
}

/// Renames a finished download to match its content type
///
/// The download is complete either way; a failed rename keeps `dest`.
async fn repair_extension(dest: PathBuf, content_type: &str) -> PathBuf {
    let Some(target) = repaired_path(&dest, content_type) else {
        return dest;
    };
    match rename_to_free(&dest, target).await {
        Ok(target) => {
            tracing::debug!("Renamed {} to {}", dest.display(), target.display());
            target
        }
        Err(e) => {
            tracing::warn!("Keeping {}, extension repair failed: {}", dest.display(), e);
            dest
        }
    }
}

async fn rename_to_free(dest: &Path, mut target: PathBuf) -> std::io::Result<PathBuf> {
    if fs::try_exists(&target).await? {
        target = unique_path(&target);
    }
    fs::rename(dest, &target).await?;
    Ok(target)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Parses an HTTP date such as `Wed, 21 Oct 2015 07:28:00 GMT`
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(SystemTime::from)
}
