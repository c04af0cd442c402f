//! Debounced ledger persistence
//!
//! Every ledger mutation hands a fresh JSON snapshot to [`DebouncedFlush`].
//! Only one write is ever pending: a new snapshot cancels the scheduled write
//! and restarts the idle timer, so a burst of mutations costs one write.
//! Snapshots taken within the last idle period are lost if the process is
//! killed; [`DebouncedFlush::flush`] writes the pending snapshot immediately
//! and must be called before a normal exit.

use crate::storage::document::write_document;
use crate::storage::LedgerError;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Single-slot write scheduler for one ledger file
pub struct DebouncedFlush {
    path: PathBuf,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    latest: Option<String>,
}

impl DebouncedFlush {
    pub fn new(path: PathBuf, delay: Duration) -> Self {
        Self {
            path,
            delay,
            pending: None,
            latest: None,
        }
    }

    /// Schedules `snapshot` to be written after the idle delay
    ///
    /// Outside a tokio runtime the snapshot is written synchronously.
    pub fn mark_dirty(&mut self, snapshot: String) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        let Ok(runtime) = Handle::try_current() else {
            if let Err(e) = write_document(&self.path, &snapshot) {
                tracing::error!("Failed to write history ledger {}: {}", self.path.display(), e);
            }
            self.latest = None;
            return;
        };

        self.latest = Some(snapshot.clone());
        let path = self.path.clone();
        let delay = self.delay;

        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let target = path.clone();
            let written =
                tokio::task::spawn_blocking(move || write_document(&target, &snapshot)).await;
            match written {
                Ok(Ok(())) => tracing::debug!("History ledger updated: {}", path.display()),
                Ok(Err(e)) => {
                    tracing::error!("Failed to write history ledger {}: {}", path.display(), e)
                }
                Err(e) => tracing::error!("History ledger write task failed: {}", e),
            }
        }));
    }

    /// Returns true while a scheduled write has not completed
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Writes the pending snapshot now, if a write is still scheduled
    pub fn flush(&mut self) -> Result<(), LedgerError> {
        let Some(handle) = self.pending.take() else {
            return Ok(());
        };
        let snapshot = self.latest.take();

        if handle.is_finished() {
            return Ok(());
        }
        handle.abort();

        if let Some(snapshot) = snapshot {
            write_document(&self.path, &snapshot)?;
            tracing::debug!("History ledger flushed: {}", self.path.display());
        }
        Ok(())
    }
}
