//! Configuration for the lifecycle manager.

use std::time::Duration;

use serde::Deserialize;

/// Timing and retry settings for the lifecycle manager.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// How long a clean teardown may take before the browser is force-closed (milliseconds).
    #[serde(default = "LifecycleConfig::default_teardown_timeout")]
    pub teardown_timeout_ms: u64,

    /// Wait between retiring a handle and creating the next one (milliseconds).
    #[serde(default = "LifecycleConfig::default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Attempts at removing a session directory flagged for cleanup.
    #[serde(default = "LifecycleConfig::default_cleanup_retries")]
    pub cleanup_retries: u32,

    /// Wait between session removal attempts (milliseconds).
    #[serde(default = "LifecycleConfig::default_cleanup_retry_delay")]
    pub cleanup_retry_delay_ms: u64,
}

impl LifecycleConfig {
    const fn default_teardown_timeout() -> u64 {
        5_000
    }

    const fn default_settle_delay() -> u64 {
        1_000
    }

    const fn default_cleanup_retries() -> u32 {
        3
    }

    const fn default_cleanup_retry_delay() -> u64 {
        1_000
    }

    /// Get the teardown timeout as a `Duration`.
    #[must_use]
    pub const fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    /// Get the settle delay as a `Duration`.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Get the cleanup retry delay as a `Duration`.
    #[must_use]
    pub const fn cleanup_retry_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_retry_delay_ms)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            teardown_timeout_ms: Self::default_teardown_timeout(),
            settle_delay_ms: Self::default_settle_delay(),
            cleanup_retries: Self::default_cleanup_retries(),
            cleanup_retry_delay_ms: Self::default_cleanup_retry_delay(),
        }
    }
}
