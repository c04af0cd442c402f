//! URL handling module for Blog-Sync
//!
//! This module provides URL normalization (ledger keys), link resolution,
//! redirect detection and the path-derived helpers used for titles and
//! file names.

mod normalize;
mod resolve;

pub use normalize::fix_url;
pub use resolve::{
    file_name, has_extension, path_extension, path_title, resolve_href, resolve_next_href,
    same_location,
};
