//! HTTP fetcher implementation
//!
//! This module handles page requests for the crawler, including:
//! - Building the HTTP client with the configured user agent
//! - Rendering a page into its final URL and markup
//! - Optional rejection of redirects that change host or path
//! - Picking the session cookie out of the page response

use crate::config::HttpConfig;
use crate::url::same_location;
use crate::SyncError;
use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// A page as delivered by the DOM capability
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// Full serialized document markup
    pub markup: String,

    /// `name=value` session cookie set by the page, if any
    pub session_cookie: Option<String>,
}

impl RenderedPage {
    /// Returns false for documents that cannot be queried (blank bodies, non-markup)
    pub fn is_usable(&self) -> bool {
        let markup = self.markup.trim();
        !markup.is_empty() && markup.contains('<')
    }
}

/// Capability that turns a URL into a rendered document
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders one page
    ///
    /// # Returns
    ///
    /// * `Ok(RenderedPage)` - The page loaded; it may still be unusable
    /// * `Err(SyncError)` - The page could not be loaded at all
    async fn render(&self, url: &Url) -> Result<RenderedPage, SyncError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use blog_sync::config::HttpConfig;
/// use blog_sync::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Renders pages over HTTP
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
    reject_redirects: bool,
    session_cookie: String,
}

impl HttpRenderer {
    /// Creates a renderer
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use
    /// * `reject_redirects` - Fail when the final URL's host or path differs
    /// * `session_cookie` - Name of the cookie forwarded to asset requests
    pub fn new(client: Client, reject_redirects: bool, session_cookie: impl Into<String>) -> Self {
        Self {
            client,
            reject_redirects,
            session_cookie: session_cookie.into(),
        }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, SyncError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| SyncError::Http {
                url: url.to_string(),
                source,
            })?;

        let final_url = response.url().clone();
        if self.reject_redirects && !same_location(url, &final_url) {
            return Err(SyncError::RedirectRejected {
                requested: url.to_string(),
                actual: final_url.to_string(),
            });
        }

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let session_cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| cookie_pair(value, &self.session_cookie));

        let markup = response.text().await.map_err(|e| SyncError::Render {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(RenderedPage {
            final_url,
            markup,
            session_cookie,
        })
    }
}

/// Extracts `name=value` from a Set-Cookie header if it sets `name`
fn cookie_pair(set_cookie: &str, name: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    let (key, value) = pair.split_once('=')?;
    if key.trim() == name && !value.trim().is_empty() {
        Some(format!("{}={}", name, value.trim()))
    } else {
        None
    }
}
