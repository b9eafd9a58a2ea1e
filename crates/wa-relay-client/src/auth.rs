//! Session authentication strategies.
//!
//! The automation client delegates credential storage to an [`AuthStrategy`].
//! [`LocalAuth`] keeps the credentials in the session directory.
//! [`ResilientAuth`] wraps any strategy and turns a locked-files failure
//! during logout into a deferred cleanup instead of an error.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::SessionDir;

/// Credential storage used by the automation client.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Make sure the credential storage exists before the client starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage could not be prepared.
    async fn prepare(&self) -> Result<()>;

    /// Discard the stored credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials could not be removed.
    async fn logout(&self) -> Result<()>;
}

/// Stores credentials in a local session directory.
#[derive(Debug, Clone)]
pub struct LocalAuth {
    session: SessionDir,
}

impl LocalAuth {
    /// Create a strategy backed by `session`.
    #[must_use]
    pub const fn new(session: SessionDir) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AuthStrategy for LocalAuth {
    async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.session.path()).await?;
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(self.session.path()).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Wraps an [`AuthStrategy`] so that `logout` never fails.
///
/// A resource-busy error leaves a cleanup marker in the session directory so
/// the next process startup can finish the job. Any other error is logged.
#[derive(Debug, Clone)]
pub struct ResilientAuth<A> {
    inner: A,
    session: SessionDir,
}

impl<A: AuthStrategy> ResilientAuth<A> {
    /// Wrap `inner`, writing cleanup markers into `session`.
    #[must_use]
    pub const fn new(inner: A, session: SessionDir) -> Self {
        Self { inner, session }
    }
}

#[async_trait]
impl<A: AuthStrategy> AuthStrategy for ResilientAuth<A> {
    async fn prepare(&self) -> Result<()> {
        self.inner.prepare().await
    }

    async fn logout(&self) -> Result<()> {
        match self.inner.logout().await {
            Ok(()) => Ok(()),
            Err(err) if err.is_resource_busy() => {
                tracing::warn!(
                    error = %err,
                    "Session files are locked; they will be removed on the next restart"
                );
                if let Err(marker_err) = self.session.mark_for_cleanup() {
                    tracing::debug!(error = %marker_err, "Could not write cleanup marker");
                }
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "Logout failed");
                Ok(())
            }
        }
    }
}
