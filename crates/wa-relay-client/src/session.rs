//! On-disk session directory and deferred cleanup.
//!
//! The automation host keeps WhatsApp credentials in the session directory.
//! When a logout cannot remove it because the browser still holds the files,
//! a marker file is left behind and the directory is wiped on the next
//! process startup, before any client is created.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the marker file requesting a deferred cleanup.
pub const CLEANUP_MARKER: &str = ".cleanup_needed";

/// Result of a startup cleanup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// No marker was present.
    NotNeeded,
    /// The marker and the session directory were removed.
    Cleaned,
    /// Cleanup was requested but could not be completed.
    Failed,
}

/// The directory holding the automation client's session files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDir {
    root: PathBuf,
}

impl SessionDir {
    /// Create a handle for the session directory at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the session directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of the cleanup marker.
    #[must_use]
    pub fn marker_path(&self) -> PathBuf {
        self.root.join(CLEANUP_MARKER)
    }

    /// Returns true if a deferred cleanup was requested.
    #[must_use]
    pub fn needs_cleanup(&self) -> bool {
        self.marker_path().exists()
    }

    /// Persist a request to wipe the session directory on the next startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker could not be written.
    pub fn mark_for_cleanup(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.marker_path(), "true")
    }

    /// Wipe the session directory if a cleanup marker is present.
    ///
    /// The marker is deleted first; directory removal is retried up to
    /// `retries` times, `retry_delay` apart. A missing directory counts as
    /// removed. Failures are logged, never returned: startup continues with
    /// whatever session is left on disk.
    pub async fn cleanup_if_marked(&self, retries: u32, retry_delay: Duration) -> CleanupOutcome {
        if !self.needs_cleanup() {
            return CleanupOutcome::NotNeeded;
        }

        tracing::info!(path = %self.root.display(), "Pending session cleanup detected");

        if let Err(err) = tokio::fs::remove_file(self.marker_path()).await {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    error = %err,
                    "Could not remove cleanup marker; continuing with existing session"
                );
                return CleanupOutcome::Failed;
            }
        }

        let attempts = retries.max(1);
        for attempt in 1..=attempts {
            match tokio::fs::remove_dir_all(&self.root).await {
                Ok(()) => {
                    tracing::info!(path = %self.root.display(), "Previous session removed");
                    return CleanupOutcome::Cleaned;
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return CleanupOutcome::Cleaned;
                }
                Err(err) if attempt < attempts => {
                    tracing::debug!(attempt, error = %err, "Session removal failed, retrying");
                    tokio::time::sleep(retry_delay).await;
                }
                Err(err) => {
                    tracing::warn!(
                        attempts,
                        error = %err,
                        "Could not fully remove previous session; continuing with existing session"
                    );
                }
            }
        }

        CleanupOutcome::Failed
    }
}
