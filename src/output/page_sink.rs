//! Saving rendered pages as HTML files

use crate::download::unique_path;
use crate::output::filename::page_file_name;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Writes rendered pages into output folders
#[derive(Debug, Clone, Copy)]
pub struct PageSink {
    dry_run: bool,
}

impl PageSink {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Saves `markup` as `<folder>/<title>.html`
    ///
    /// An existing file is never overwritten; the new file gets a collision
    /// token instead.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` - Where the page was written
    /// * `Ok(None)` - Dry-run, nothing written
    /// * `Err(io::Error)` - The file could not be written
    pub async fn save(
        &self,
        folder: &Path,
        title: &str,
        markup: &str,
    ) -> Result<Option<PathBuf>, std::io::Error> {
        let mut path = folder.join(page_file_name(title));
        if self.dry_run {
            tracing::info!("Skipped page save {}", path.display());
            return Ok(None);
        }

        let mut attempts = 0;
        let mut file = loop {
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempts < 5 => {
                    attempts += 1;
                    path = unique_path(&folder.join(page_file_name(title)));
                }
                Err(e) => return Err(e),
            }
        };

        file.write_all(markup.as_bytes()).await?;
        file.flush().await?;
        tracing::info!("Saved page {}", path.display());
        Ok(Some(path))
    }
}
