use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::{Path, PathBuf};

/// Values given on the command line; each `Some` or `true` wins over the job file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub home: Option<String>,
    pub out: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
    pub page_pattern: Option<String>,
    pub next_pattern: Option<String>,
    pub pager_url: Option<String>,
    pub save_pattern: Option<String>,
    pub ignore_query: Option<String>,
    pub title_pattern: Option<String>,
    pub next_filter_pattern: Option<String>,
    pub pager_page_pattern: Option<String>,
    pub sleep: Option<u64>,
    pub user_agent: Option<String>,
    pub session_cookie: Option<String>,
    pub stop_early: bool,
    pub no_revisit: bool,
    pub folderize: bool,
    pub ignore_history: bool,
    pub save_page: bool,
    pub folder_uses_pathname: bool,
    pub no_redirect: bool,
    pub update_data_only: bool,
}

/// Loads and parses a job file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML job file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use blog_sync::config::load_config;
///
/// let config = load_config(Path::new("gallery.toml")).unwrap();
/// println!("Home: {}", config.job.home);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut config = read_config(path)?;
    expand_paths(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Builds the effective configuration from an optional job file and CLI values
///
/// The job file supplies defaults, the command line overrides them, and the
/// merged result is validated once.
pub fn build_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => Config::default(),
    };

    apply_overrides(&mut config, overrides);
    expand_paths(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Resolves the ledger file without requiring a complete, valid job
///
/// Used by read-only modes that never crawl. A command-line data file wins
/// over the job file's `data-file`, which wins over the default.
pub fn ledger_path(path: Option<&Path>, data_file: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    let data_file = match (data_file, path) {
        (Some(data_file), _) => data_file,
        (None, Some(path)) => read_config(path)?.job.data_file,
        (None, None) => Config::default().job.data_file,
    };
    Ok(expand_tilde(&data_file))
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, overrides: ConfigOverrides) {
    let ConfigOverrides {
        home,
        out,
        data_file,
        page_pattern,
        next_pattern,
        pager_url,
        save_pattern,
        ignore_query,
        title_pattern,
        next_filter_pattern,
        pager_page_pattern,
        sleep,
        user_agent,
        session_cookie,
        stop_early,
        no_revisit,
        folderize,
        ignore_history,
        save_page,
        folder_uses_pathname,
        no_redirect,
        update_data_only,
    } = overrides;

    if let Some(home) = home {
        config.job.home = home;
    }
    if out.is_some() {
        config.job.out = out;
    }
    if let Some(data_file) = data_file {
        config.job.data_file = data_file;
    }

    let patterns = &mut config.patterns;
    patterns.page_pattern = page_pattern.or(patterns.page_pattern.take());
    patterns.next_pattern = next_pattern.or(patterns.next_pattern.take());
    patterns.pager_url = pager_url.or(patterns.pager_url.take());
    patterns.save_pattern = save_pattern.or(patterns.save_pattern.take());
    patterns.title_pattern = title_pattern.or(patterns.title_pattern.take());
    patterns.next_filter_pattern = next_filter_pattern.or(patterns.next_filter_pattern.take());
    patterns.pager_page_pattern = pager_page_pattern.or(patterns.pager_page_pattern.take());
    if let Some(ignore_query) = ignore_query {
        patterns.ignore_query = split_list(&ignore_query);
    }

    let behavior = &mut config.behavior;
    behavior.stop_early |= stop_early;
    behavior.no_revisit |= no_revisit;
    behavior.folderize |= folderize;
    behavior.ignore_history |= ignore_history;
    behavior.save_page |= save_page;
    behavior.folder_uses_pathname |= folder_uses_pathname;
    behavior.no_redirect |= no_redirect;
    behavior.update_data_only |= update_data_only;
    if let Some(sleep) = sleep {
        behavior.sleep = sleep;
    }

    if let Some(user_agent) = user_agent {
        config.http.user_agent = user_agent;
    }
    if let Some(session_cookie) = session_cookie {
        config.http.session_cookie = session_cookie;
    }
}

fn expand_paths(config: &mut Config) {
    if let Some(out) = config.job.out.take() {
        config.job.out = Some(expand_tilde(&out));
    }
    config.job.data_file = expand_tilde(&config.job.data_file);
}

/// Expands a leading `~` to the current user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[job]
home = "https://example.com/gallery"
out = "/tmp/gallery"
data-file = "/tmp/history.json"

[patterns]
next-pattern = "a.next"
save-pattern = "div.post img, div.post a"
ignore-query = ["utm_source", "sid"]

[behavior]
no-revisit = true
sleep = 2
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.job.home, "https://example.com/gallery");
        assert_eq!(config.job.out, Some(PathBuf::from("/tmp/gallery")));
        assert_eq!(config.patterns.next_pattern.as_deref(), Some("a.next"));
        assert_eq!(config.patterns.ignore_query, vec!["utm_source", "sid"]);
        assert!(config.behavior.no_revisit);
        assert!(!config.behavior.stop_early);
        assert_eq!(config.behavior.sleep, 2);
        assert_eq!(config.behavior.flush_delay_ms, 1000);
        assert_eq!(config.http.session_cookie, "PHPSESSID");
        assert!(config.assets.image_extensions.contains(&"php".to_string()));
        assert!(!config.assets.link_extensions.contains(&"php".to_string()));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/job.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_missing_home_fails_validation() {
        let file = create_temp_config("[behavior]\nstop-early = true\n");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_job_file() {
        let config_content = r#"
[job]
home = "https://example.com/old"

[patterns]
next-pattern = "a.next"
"#;
        let file = create_temp_config(config_content);

        let overrides = ConfigOverrides {
            home: Some("https://example.com/new".to_string()),
            ignore_query: Some("utm_source, fbclid".to_string()),
            stop_early: true,
            sleep: Some(3),
            ..Default::default()
        };

        let config = build_config(Some(file.path()), overrides).unwrap();
        assert_eq!(config.job.home, "https://example.com/new");
        assert_eq!(config.patterns.next_pattern.as_deref(), Some("a.next"));
        assert_eq!(config.patterns.ignore_query, vec!["utm_source", "fbclid"]);
        assert!(config.behavior.stop_early);
        assert_eq!(config.behavior.sleep, 3);
    }

    #[test]
    fn test_build_config_without_file() {
        let overrides = ConfigOverrides {
            home: Some("https://example.com/blog/".to_string()),
            ..Default::default()
        };
        let config = build_config(None, overrides).unwrap();
        assert_eq!(config.job.data_file, PathBuf::from("data.txt"));
        assert_eq!(config.job_title(), "blog");
    }

    #[test]
    fn test_job_title_prefers_out_folder() {
        let overrides = ConfigOverrides {
            home: Some("https://example.com/blog/".to_string()),
            out: Some(PathBuf::from("/archive/cats")),
            ..Default::default()
        };
        let config = build_config(None, overrides).unwrap();
        assert_eq!(config.job_title(), "cats");
    }

    #[test]
    fn test_ledger_path_without_valid_job() {
        let file = create_temp_config("[job]\ndata-file = \"/tmp/hist.json\"\n");
        assert_eq!(
            ledger_path(Some(file.path()), None).unwrap(),
            PathBuf::from("/tmp/hist.json")
        );
        assert_eq!(
            ledger_path(Some(file.path()), Some(PathBuf::from("/tmp/other.json"))).unwrap(),
            PathBuf::from("/tmp/other.json")
        );
        assert_eq!(ledger_path(None, None).unwrap(), PathBuf::from("data.txt"));
    }

    #[test]
    fn test_expand_tilde() {
        let plain = Path::new("/var/data");
        assert_eq!(expand_tilde(plain), PathBuf::from("/var/data"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/pics")), home.join("pics"));
        }
    }
}
