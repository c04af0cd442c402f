//! HTML extraction for crawled pages
//!
//! This module handles querying a rendered document for:
//! - The page title (title selector or URL path)
//! - Savable assets and sub-pages (save selectors)
//! - The next page(s) to follow (next selector, filter, pager template)
//!
//! Everything is extracted in one synchronous pass so the parsed document
//! never has to live across an await point.

use crate::config::Config;
use crate::url::{has_extension, path_title, resolve_href, resolve_next_href};
use crate::ConfigError;
use regex::{NoExpand, Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiled selectors and patterns, built once per run
#[derive(Debug, Clone)]
pub struct ExtractRules {
    pub save_selectors: Vec<Selector>,
    pub next_selector: Option<Selector>,
    pub title_selector: Option<Selector>,
    pub next_filter: Option<Regex>,
    pub pager: Option<PagerTemplate>,
    pub link_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
    pub folder_uses_pathname: bool,
}

impl ExtractRules {
    /// Compiles the rules of a validated configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let patterns = &config.patterns;

        let save_selectors = match patterns.save_pattern.as_deref() {
            Some(list) => list
                .split(',')
                .map(compile_selector)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let pager = match (patterns.pager_url.as_deref(), patterns.pager_page_pattern.as_deref()) {
            (Some(template), Some(page_pattern)) => {
                Some(PagerTemplate::new(template, page_pattern)?)
            }
            _ => None,
        };

        Ok(Self {
            save_selectors,
            next_selector: patterns.next_pattern.as_deref().map(compile_selector).transpose()?,
            title_selector: patterns.title_pattern.as_deref().map(compile_selector).transpose()?,
            next_filter: patterns
                .next_filter_pattern
                .as_deref()
                .map(compile_regex)
                .transpose()?,
            pager,
            link_extensions: config.assets.link_extensions.clone(),
            image_extensions: config.assets.image_extensions.clone(),
            folder_uses_pathname: config.behavior.folder_uses_pathname,
        })
    }
}

/// Next-page URL template with a `{PAGE}` placeholder
#[derive(Debug, Clone)]
pub struct PagerTemplate {
    template: String,
    page_pattern: Regex,
    placeholder: Regex,
}

impl PagerTemplate {
    pub fn new(template: &str, page_pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            template: template.to_string(),
            page_pattern: compile_regex(page_pattern)?,
            placeholder: compile_regex(r"\{PAGE\}")?,
        })
    }

    /// Builds the next-page URL from a next anchor's markup
    ///
    /// The page number is the first capture group of the page pattern.
    pub fn next_url(&self, anchor_html: &str, page_url: &Url) -> Option<Url> {
        let page = self.page_pattern.captures(anchor_html)?.get(1)?.as_str();
        let href = self.placeholder.replace_all(&self.template, NoExpand(page));
        resolve_href(page_url, &href)
    }
}

/// Something a save selector matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    /// A file to download
    Asset(Url),

    /// A linked page to fetch for more assets
    SubPage(Url),
}

/// Everything the engine needs from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtract {
    /// Title used for the asset folder
    pub folder_title: String,

    /// Title used for the saved page file
    pub page_title: String,

    /// Save-selector matches in selector order, then document order
    pub targets: Vec<SaveTarget>,

    /// Pages to continue with
    pub next_pages: Vec<Url>,
}

/// Extracts titles, save targets and next pages from a rendered page
///
/// # Arguments
///
/// * `markup` - The rendered document
/// * `page_url` - URL the page was requested as (titles derive from it)
/// * `base_url` - URL relative links resolve against (after redirects)
/// * `rules` - Compiled selectors and patterns
/// * `inherited_title` - Title handed down from the parent page
/// * `follow_next` - Whether to look for next pages at all
pub fn extract_page(
    markup: &str,
    page_url: &Url,
    base_url: &Url,
    rules: &ExtractRules,
    inherited_title: Option<&str>,
    follow_next: bool,
) -> PageExtract {
    let document = Html::parse_document(markup);

    let (folder_title, page_title) = resolve_titles(&document, page_url, rules, inherited_title);

    let mut targets = Vec::new();
    for selector in &rules.save_selectors {
        for element in document.select(selector) {
            if let Some(target) = save_target(element, base_url, rules) {
                targets.push(target);
            }
        }
    }

    let next_pages = match (&rules.next_selector, follow_next) {
        (Some(selector), true) => next_targets(&document, selector, base_url, rules),
        _ => Vec::new(),
    };

    PageExtract {
        folder_title,
        page_title,
        targets,
        next_pages,
    }
}

/// Finds the first element matching `selector` and resolves it as a link
///
/// Only the first match is considered; later matches are ignored.
pub fn first_link(markup: &str, base_url: &Url, selector: &Selector) -> Option<Url> {
    let document = Html::parse_document(markup);
    let element = document.select(selector).next()?;

    match element.value().name() {
        "a" => {
            let href = element.value().attr("href")?;
            resolve_href(base_url, href)
        }
        tag => {
            tracing::warn!("Unknown element tag for first page. Skipped: {}", tag);
            None
        }
    }
}

/// Collapses a title: lines joined with " - ", whitespace runs squeezed
pub fn collapse_title(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" - ")
}

fn resolve_titles(
    document: &Html,
    page_url: &Url,
    rules: &ExtractRules,
    inherited_title: Option<&str>,
) -> (String, String) {
    let (folder, page) = match inherited_title {
        Some(inherited) => (Some(inherited.to_string()), Some(inherited.to_string())),
        None => {
            let selected = rules.title_selector.as_ref().and_then(|selector| {
                document
                    .select(selector)
                    .next()
                    .map(|element| collapse_title(&element.text().collect::<String>()))
                    .filter(|title| !title.is_empty())
            });
            let folder = if rules.folder_uses_pathname {
                None
            } else {
                selected.clone()
            };
            (folder, selected)
        }
    };

    let folder = folder.unwrap_or_else(|| path_title(page_url));
    let page = page.unwrap_or_else(|| folder.clone());
    (folder, page)
}

fn save_target(element: ElementRef<'_>, base_url: &Url, rules: &ExtractRules) -> Option<SaveTarget> {
    match element.value().name() {
        "a" => {
            let href = element.value().attr("href")?;
            let url = resolve_href(base_url, href)?;
            if has_extension(&url, &rules.link_extensions) {
                Some(SaveTarget::Asset(url))
            } else {
                Some(SaveTarget::SubPage(url))
            }
        }
        "img" => {
            let src = element.value().attr("src")?;
            let url = resolve_href(base_url, src)?;
            if has_extension(&url, &rules.image_extensions) {
                Some(SaveTarget::Asset(url))
            } else {
                tracing::debug!("Image without a savable extension skipped: {}", url);
                None
            }
        }
        tag => {
            tracing::warn!("Unknown element tag to save. Skipped: {}", tag);
            None
        }
    }
}

fn next_targets(
    document: &Html,
    selector: &Selector,
    base_url: &Url,
    rules: &ExtractRules,
) -> Vec<Url> {
    let candidates = document.select(selector);
    let chosen: Vec<ElementRef<'_>> = match &rules.next_filter {
        Some(filter) => candidates
            .filter(|element| filter.is_match(&element.text().collect::<String>()))
            .collect(),
        None => candidates.take(1).collect(),
    };

    let mut next_pages = Vec::new();
    for element in chosen {
        if element.value().name() != "a" {
            tracing::warn!(
                "Unknown element tag to go next. Skipped: {}",
                element.value().name()
            );
            continue;
        }

        let next = match &rules.pager {
            Some(pager) => {
                let next = pager.next_url(&element.html(), base_url);
                if next.is_none() {
                    tracing::warn!("Pager page pattern did not match next link: {}", element.html());
                }
                next
            }
            None => element
                .value()
                .attr("href")
                .and_then(|href| resolve_next_href(base_url, href)),
        };

        if let Some(next) = next {
            next_pages.push(next);
        }
    }
    next_pages
}

fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    let selector = selector.trim();
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidPattern(format!("selector '{}': {:?}", selector, e)))
}

fn compile_regex(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern(format!("regex '{}': {}", pattern, e)))
}
