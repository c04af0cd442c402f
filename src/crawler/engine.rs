//! Page fetch engine
//!
//! Walks a blog depth-first from a start page: render, extract, hand assets
//! and rendered pages to the [`CrawlHooks`], then continue with sub-pages and
//! next pages. The walk is driven by an explicit work stack; items are pushed
//! in reverse so they pop in the order a recursive walk would visit them.

use crate::crawler::fetcher::PageRenderer;
use crate::crawler::parser::{extract_page, ExtractRules, SaveTarget};
use crate::crawler::scheduler::Throttle;
use crate::download::AssetHeaders;
use crate::url::fix_url;
use async_trait::async_trait;
use std::collections::HashSet;
use url::Url;

/// Render attempts per page before a malformed document is given up on
pub const MAX_RENDER_ATTEMPTS: u32 = 3;

/// One page to fetch, with the context it was discovered in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,

    /// Title handed down from the parent page (sub-pages only)
    pub inherited_title: Option<String>,

    /// Look for next pages on this page
    pub follow_next: bool,

    /// Ask [`CrawlHooks::should_fetch`] before rendering
    pub check_should_fetch: bool,

    /// Hand the rendered page to [`CrawlHooks::on_page_rendered`]
    pub save_page: bool,

    /// Render attempts already spent on this page
    pub redo: u32,
}

impl FetchRequest {
    /// A regular page: next links followed, admission checked, page saved
    pub fn page(url: Url) -> Self {
        Self {
            url,
            inherited_title: None,
            follow_next: true,
            check_should_fetch: true,
            save_page: true,
            redo: 0,
        }
    }

    /// A leaf page linked from a save selector
    pub fn sub_page(url: Url, title: String) -> Self {
        Self {
            url,
            inherited_title: Some(title),
            follow_next: false,
            check_should_fetch: false,
            save_page: false,
            redo: 0,
        }
    }

    /// The same request again, admitted without asking the hooks
    fn retry(&self) -> Self {
        Self {
            check_should_fetch: false,
            redo: self.redo + 1,
            ..self.clone()
        }
    }
}

/// An asset found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub url: Url,
    pub headers: AssetHeaders,
    pub folder_title: String,
}

/// A rendered page ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: Url,
    pub page_title: String,
    pub folder_title: String,
    pub markup: String,
}

/// Callbacks through which the engine reaches storage and the filesystem
#[async_trait]
pub trait CrawlHooks: Send {
    /// Decides whether a page is fetched; may record it as visited
    fn should_fetch(&mut self, url: &Url) -> bool;

    /// Receives every asset matched by a save selector
    async fn on_asset(&mut self, asset: AssetReference);

    /// Receives every rendered page whose request allows saving
    async fn on_page_rendered(&mut self, page: PageSnapshot);
}

/// Counters for one engine run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineReport {
    pub pages_rendered: u64,
    pub pages_declined: u64,
    pub pages_revisited: u64,
    pub render_failures: u64,
    pub malformed_retries: u64,
    pub malformed_abandoned: u64,
    pub assets_found: u64,
}

enum Work {
    Fetch(FetchRequest),
    Asset(AssetReference),
    SavePage(PageSnapshot),
}

/// Sequential depth-first page walker
pub struct FetchEngine<R> {
    renderer: R,
    rules: ExtractRules,
    ignore_query: Vec<String>,
    throttle: Throttle,
}

impl<R: PageRenderer> FetchEngine<R> {
    /// Creates an engine
    ///
    /// # Arguments
    ///
    /// * `renderer` - Turns URLs into documents
    /// * `rules` - Compiled selectors and patterns
    /// * `ignore_query` - Query parameters dropped when normalizing URLs
    /// * `throttle` - Delay before each render
    pub fn new(renderer: R, rules: ExtractRules, ignore_query: Vec<String>, throttle: Throttle) -> Self {
        Self {
            renderer,
            rules,
            ignore_query,
            throttle,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Walks the site from `start` until no work is left
    pub async fn run<H>(&self, start: &Url, hooks: &mut H) -> EngineReport
    where
        H: CrawlHooks + ?Sized,
    {
        let mut report = EngineReport::default();
        // Keyed by role too: a next page also matched by a save selector is
        // rendered once as a leaf and once as part of the chain.
        let mut rendered: HashSet<(String, bool)> = HashSet::new();
        let mut session_cookie: Option<String> = None;
        let mut stack = vec![Work::Fetch(FetchRequest::page(start.clone()))];

        while let Some(work) = stack.pop() {
            let request = match work {
                Work::Fetch(request) => request,
                Work::Asset(asset) => {
                    hooks.on_asset(asset).await;
                    continue;
                }
                Work::SavePage(page) => {
                    hooks.on_page_rendered(page).await;
                    continue;
                }
            };

            let url = match fix_url(request.url.as_str(), &self.ignore_query) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", request.url, e);
                    continue;
                }
            };

            if request.check_should_fetch && !hooks.should_fetch(&url) {
                tracing::debug!("Declined {}", url);
                report.pages_declined += 1;
                continue;
            }

            if request.redo == 0 && !rendered.insert((url.to_string(), request.follow_next)) {
                tracing::debug!("Already rendered in this run: {}", url);
                report.pages_revisited += 1;
                continue;
            }

            self.throttle.pause().await;
            tracing::info!("Fetching {}", url);

            let page = match self.renderer.render(&url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Failed fetch {}: {}", url, e);
                    report.render_failures += 1;
                    continue;
                }
            };

            if !page.is_usable() {
                if request.redo + 1 < MAX_RENDER_ATTEMPTS {
                    tracing::debug!("Malformed document at {}, retrying", url);
                    report.malformed_retries += 1;
                    stack.push(Work::Fetch(FetchRequest {
                        url,
                        ..request.retry()
                    }));
                } else {
                    tracing::warn!(
                        "Failed fetch {}: malformed document after {} attempts",
                        url,
                        MAX_RENDER_ATTEMPTS
                    );
                    report.malformed_abandoned += 1;
                }
                continue;
            }

            report.pages_rendered += 1;
            if page.session_cookie.is_some() {
                session_cookie = page.session_cookie.clone();
            }

            let extract = extract_page(
                &page.markup,
                &url,
                &page.final_url,
                &self.rules,
                request.inherited_title.as_deref(),
                request.follow_next,
            );

            let headers = AssetHeaders {
                referer: Some(page.final_url.to_string()),
                cookie: session_cookie.clone(),
            };

            let mut follow_ups = Vec::with_capacity(extract.targets.len() + extract.next_pages.len() + 1);
            for target in extract.targets {
                match target {
                    SaveTarget::Asset(asset) => {
                        report.assets_found += 1;
                        follow_ups.push(Work::Asset(AssetReference {
                            url: asset,
                            headers: headers.clone(),
                            folder_title: extract.folder_title.clone(),
                        }));
                    }
                    SaveTarget::SubPage(sub_page) => follow_ups.push(Work::Fetch(
                        FetchRequest::sub_page(sub_page, extract.folder_title.clone()),
                    )),
                }
            }

            if request.save_page {
                follow_ups.push(Work::SavePage(PageSnapshot {
                    url: url.clone(),
                    page_title: extract.page_title,
                    folder_title: extract.folder_title,
                    markup: page.markup,
                }));
            }

            follow_ups.extend(extract.next_pages.into_iter().map(|next| Work::Fetch(FetchRequest::page(next))));
            stack.extend(follow_ups.into_iter().rev());
        }

        report
    }
}
