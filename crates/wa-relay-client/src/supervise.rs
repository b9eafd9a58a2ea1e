//! Background failure handling.
//!
//! Client work that runs outside a request/response cycle must never take
//! the process down. Errors are logged; locked session files get an extra
//! hint because the fix is operational, not code.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::error::{ClientError, Result};

/// Returns true if an error message describes a resource-busy condition.
#[must_use]
pub fn is_resource_busy_message(message: &str) -> bool {
    message.contains("EBUSY") || message.to_ascii_lowercase().contains("resource busy")
}

/// Log an error raised by background client work.
pub fn report_background_error(task: &str, err: &ClientError) {
    if err.is_resource_busy() {
        tracing::warn!(task, error = %err, "Locked session files detected; server keeps running");
        tracing::info!(
            "To reconnect, open the QR endpoint or restart the server once the browser has exited"
        );
    } else {
        tracing::error!(task, error = %err, "Background client operation failed");
    }
}

/// Run `future` on the runtime, logging its error instead of propagating it.
pub fn spawn_supervised<F>(task: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = future.await {
            report_background_error(task, &err);
        }
    })
}
