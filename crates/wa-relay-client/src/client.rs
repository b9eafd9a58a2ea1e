//! The seam between the manager and the external automation client.
//!
//! The automation client is a black box: it emits lifecycle events through
//! the [`EventSink`] it is created with and accepts a handful of commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use wa_relay_core::ChatId;

use crate::auth::AuthStrategy;
use crate::error::Result;
use crate::event::EventSink;

/// Shared reference to the active automation client.
pub type ClientHandle = Arc<dyn AutomationClient>;

/// Commands accepted by an automation client instance.
///
/// This trait abstracts the automation client, allowing for mock
/// implementations in tests.
#[async_trait]
pub trait AutomationClient: Send + Sync {
    /// Start the client. Progress is reported through the event sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the client could not be started at all.
    async fn initialize(&self) -> Result<()>;

    /// Send a text message to a chat.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Send` if the client rejected the message.
    async fn send_message(&self, chat_id: &ChatId, body: &str) -> Result<()>;

    /// Shut the client down cleanly.
    ///
    /// # Errors
    ///
    /// Returns an error if the clean shutdown failed.
    async fn destroy(&self) -> Result<()>;

    /// Release the browser process backing the client, without a clean shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser could not be closed.
    async fn close_browser(&self) -> Result<()>;
}

/// Creates automation client instances.
pub trait ClientFactory: Send + Sync {
    /// Create a new, not yet initialized, client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client could not be constructed.
    fn create(
        &self,
        options: &ClientOptions,
        events: EventSink,
        auth: Arc<dyn AuthStrategy>,
    ) -> Result<ClientHandle>;
}

/// Options forwarded to every client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Directory holding the session credentials.
    pub session_dir: PathBuf,
    /// Browser executable used by the automation host. `None` uses its bundled browser.
    pub executable_path: Option<PathBuf>,
    /// Run the browser without a window.
    pub headless: bool,
    /// Extra browser command-line flags.
    pub browser_args: Vec<String>,
}

impl ClientOptions {
    /// Browser flags suited to running inside containers and small VMs.
    pub const DEFAULT_BROWSER_ARGS: [&'static str; 7] = [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-accelerated-2d-canvas",
        "--no-first-run",
        "--no-zygote",
        "--disable-gpu",
    ];

    /// Create headless options with the default browser flags.
    #[must_use]
    pub fn new(session_dir: impl AsRef<Path>) -> Self {
        Self {
            session_dir: session_dir.as_ref().to_path_buf(),
            executable_path: None,
            headless: true,
            browser_args: Self::DEFAULT_BROWSER_ARGS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Use a specific browser executable.
    #[must_use]
    pub fn with_executable_path(mut self, path: Option<PathBuf>) -> Self {
        self.executable_path = path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = ClientOptions::new(".wa_session");
        assert_eq!(options.session_dir, PathBuf::from(".wa_session"));
        assert!(options.headless);
        assert!(options.executable_path.is_none());
        assert!(options.browser_args.iter().any(|a| a == "--no-sandbox"));
    }

    #[test]
    fn executable_override() {
        let options =
            ClientOptions::new("s").with_executable_path(Some("/usr/bin/chromium".into()));
        assert_eq!(
            options.executable_path.as_deref(),
            Some(Path::new("/usr/bin/chromium"))
        );
    }
}
