//! Process restart scheduling.
//!
//! The relay cannot relaunch itself. `restart-server` schedules a clean exit
//! and relies on a process supervisor (systemd, Docker, PM2, ...) to start a
//! fresh process.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while scheduling a restart.
#[derive(Debug, Error)]
pub enum RestartError {
    /// No async runtime is available to run the delayed exit.
    #[error("cannot schedule restart: {0}")]
    Unavailable(String),
}

/// Schedules the process exit behind a server restart.
pub trait ProcessRestarter: Send + Sync {
    /// Arrange for the process to exit after `delay`.
    ///
    /// # Errors
    ///
    /// Returns an error if the exit could not be scheduled.
    fn schedule_restart(&self, delay: Duration) -> Result<(), RestartError>;
}

/// Exits the process with status 0 once the delay has elapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitRestarter;

impl ProcessRestarter for ExitRestarter {
    fn schedule_restart(&self, delay: Duration) -> Result<(), RestartError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RestartError::Unavailable(e.to_string()))?;

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!("Shutting down for restart");
            tracing::info!(
                "Make sure a process supervisor (systemd, Docker, PM2) relaunches the server"
            );
            std::process::exit(0);
        });

        Ok(())
    }
}
