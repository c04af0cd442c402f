use crate::config::types::{AssetConfig, BehaviorConfig, Config, HttpConfig, JobConfig, PatternConfig};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Longest politeness delay accepted, in seconds
const MAX_SLEEP_SECS: u64 = 3600;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_job_config(&config.job)?;
    validate_pattern_config(&config.patterns)?;
    validate_behavior_config(&config.behavior)?;
    validate_asset_config(&config.assets)?;
    validate_http_config(&config.http)?;
    Ok(())
}

/// Validates the seed URL and output locations
fn validate_job_config(config: &JobConfig) -> Result<(), ConfigError> {
    if config.home.trim().is_empty() {
        return Err(ConfigError::Validation(
            "home cannot be empty".to_string(),
        ));
    }

    let home = Url::parse(config.home.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid home '{}': {}", config.home, e)))?;
    if home.scheme() != "http" && home.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "home must be an HTTP or HTTPS URL, got '{}'",
            config.home
        )));
    }

    if config.data_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-file cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates selectors, regexes and the pager template
fn validate_pattern_config(config: &PatternConfig) -> Result<(), ConfigError> {
    validate_selector("page-pattern", config.page_pattern.as_deref())?;
    validate_selector("next-pattern", config.next_pattern.as_deref())?;
    validate_selector("title-pattern", config.title_pattern.as_deref())?;

    if let Some(save_pattern) = config.save_pattern.as_deref() {
        for selector in save_pattern.split(',') {
            validate_selector("save-pattern", Some(selector))?;
        }
    }

    validate_regex("next-filter-pattern", config.next_filter_pattern.as_deref())?;
    validate_regex("pager-page-pattern", config.pager_page_pattern.as_deref())?;

    if let Some(pager_url) = config.pager_url.as_deref() {
        if !pager_url.to_ascii_uppercase().contains("{PAGE}") {
            return Err(ConfigError::Validation(format!(
                "pager-url must contain a {{PAGE}} placeholder, got '{}'",
                pager_url
            )));
        }
        if config.pager_page_pattern.is_none() {
            return Err(ConfigError::Validation(
                "pager-url requires pager-page-pattern to extract the page number".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_behavior_config(config: &BehaviorConfig) -> Result<(), ConfigError> {
    if config.sleep > MAX_SLEEP_SECS {
        return Err(ConfigError::Validation(format!(
            "sleep must be <= {} seconds, got {}",
            MAX_SLEEP_SECS, config.sleep
        )));
    }
    Ok(())
}

fn validate_asset_config(config: &AssetConfig) -> Result<(), ConfigError> {
    for ext in config.link_extensions.iter().chain(&config.image_extensions) {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "asset extensions are given without a leading dot, got '{}'",
                ext
            )));
        }
    }
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.session_cookie.is_empty()
        || config
            .session_cookie
            .chars()
            .any(|c| c.is_whitespace() || c == '=' || c == ';')
    {
        return Err(ConfigError::Validation(format!(
            "session-cookie must be a plain cookie name, got '{}'",
            config.session_cookie
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_selector(name: &str, selector: Option<&str>) -> Result<(), ConfigError> {
    let Some(selector) = selector else {
        return Ok(());
    };
    Selector::parse(selector.trim())
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("{} '{}': {:?}", name, selector, e)))
}

fn validate_regex(name: &str, pattern: Option<&str>) -> Result<(), ConfigError> {
    let Some(pattern) = pattern else {
        return Ok(());
    };
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("{} '{}': {}", name, pattern, e)))
}
