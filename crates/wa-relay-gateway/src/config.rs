//! Gateway configuration types.
//!
//! Configuration comes from the process environment (optionally seeded from a
//! `.env` file by the binary). Every setting has a default so the relay starts
//! with no configuration at all.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value of the wrong shape.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// TCP port to listen on (`PORT`).
    #[serde(default = "GatewayConfig::default_port")]
    pub port: u16,

    /// Public base URL used in links and logs (`BASE_URL`).
    /// Defaults to `http://localhost:{port}`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// History database directory (`HISTORY_DB_PATH`). History is disabled when unset.
    #[serde(default)]
    pub history_db_path: Option<PathBuf>,

    /// Automation host base URL (`AUTOMATION_URL`).
    #[serde(default = "GatewayConfig::default_automation_url")]
    pub automation_url: String,

    /// Browser executable forwarded to the automation host (`CHROME_PATH`).
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// WhatsApp session directory (`SESSION_DIR`).
    #[serde(default = "GatewayConfig::default_session_dir")]
    pub session_dir: PathBuf,

    /// Allowed CORS origins.
    #[serde(default = "GatewayConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Delay between acknowledging a server restart and exiting (milliseconds).
    #[serde(default = "GatewayConfig::default_restart_delay")]
    pub restart_delay_ms: u64,
}

impl GatewayConfig {
    const fn default_port() -> u16 {
        3000
    }

    fn default_automation_url() -> String {
        "http://127.0.0.1:3100".to_string()
    }

    fn default_session_dir() -> PathBuf {
        PathBuf::from(".wa_session")
    }

    fn default_cors_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_restart_delay() -> u64 {
        2_000
    }

    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration through `lookup`, which maps a variable name to its value.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is not a valid port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = var("PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: port,
            })?;
        }
        config.base_url = var("BASE_URL");
        config.history_db_path = var("HISTORY_DB_PATH").map(PathBuf::from);
        config.chrome_path = var("CHROME_PATH").map(PathBuf::from);
        if let Some(url) = var("AUTOMATION_URL") {
            config.automation_url = url;
        }
        if let Some(dir) = var("SESSION_DIR") {
            config.session_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Public base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url.as_deref().map_or_else(
            || format!("http://localhost:{}", self.port),
            |url| url.trim_end_matches('/').to_string(),
        )
    }

    /// Address to bind the HTTP listener to.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the server restart delay as a `Duration`.
    #[must_use]
    pub const fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: Self::default_port(),
            base_url: None,
            history_db_path: None,
            automation_url: Self::default_automation_url(),
            chrome_path: None,
            session_dir: Self::default_session_dir(),
            cors_origins: Self::default_cors_origins(),
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            restart_delay_ms: Self::default_restart_delay(),
        }
    }
}
