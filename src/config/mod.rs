//! Configuration module for Blog-Sync
//!
//! This module handles loading TOML job files, merging command-line
//! overrides on top of them, and validating the result.
//!
//! # Example
//!
//! ```no_run
//! use blog_sync::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("gallery.toml")).unwrap();
//! println!("Crawling from {} into job '{}'", config.job.home, config.job_title());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AssetConfig, BehaviorConfig, Config, HttpConfig, JobConfig, PatternConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{build_config, expand_tilde, ledger_path, load_config, ConfigOverrides};
pub use validation::validate;
