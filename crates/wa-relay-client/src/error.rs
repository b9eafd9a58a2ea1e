//! Error types for client lifecycle management.

use std::io;

use thiserror::Error;

use crate::supervise::is_resource_busy_message;

/// A result type using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while driving the automation client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The automation client rejected the stored or scanned credentials.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// The handle was retired, or stopped emitting events, before it became ready.
    #[error("client handle was retired before it became ready")]
    Retired,

    /// The automation client failed to send a message.
    #[error("{0}")]
    Send(String),

    /// Communication with the automation host failed.
    #[error("automation host error: {0}")]
    Bridge(String),

    /// Filesystem error while managing the session directory.
    #[error("session storage error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Returns true if this error means a file or resource is locked by another process.
    #[must_use]
    pub fn is_resource_busy(&self) -> bool {
        match self {
            Self::Io(err) => is_resource_busy_io(err),
            Self::Bridge(msg) | Self::Send(msg) | Self::AuthFailure(msg) => {
                is_resource_busy_message(msg)
            }
            Self::Retired => false,
        }
    }
}

/// Returns true if the I/O error is a resource-busy (`EBUSY`) condition.
#[must_use]
pub fn is_resource_busy_io(err: &io::Error) -> bool {
    // EBUSY is 16 on Linux and macOS.
    err.kind() == io::ErrorKind::ResourceBusy
        || err.raw_os_error() == Some(16)
        || is_resource_busy_message(&err.to_string())
}
