//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use wa_relay_client::LifecycleManager;
use wa_relay_store::{HistoryStore, MessageRecord};

use crate::config::GatewayConfig;
use crate::restart::ProcessRestarter;

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers.
pub struct GatewayState<S>
where
    S: HistoryStore,
{
    /// The connection lifecycle manager owning the WhatsApp client.
    pub manager: Arc<LifecycleManager>,
    /// The send-history log. `None` when history is disabled or failed to open.
    pub history: Option<Arc<S>>,
    /// Schedules the process exit behind `restart-server`.
    pub restarter: Arc<dyn ProcessRestarter>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<S> GatewayState<S>
where
    S: HistoryStore,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        manager: Arc<LifecycleManager>,
        history: Option<Arc<S>>,
        restarter: Arc<dyn ProcessRestarter>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            manager,
            history,
            restarter,
            config,
        }
    }

    /// Record a send attempt, logging instead of failing when the log is unavailable.
    pub fn record(&self, record: &MessageRecord) {
        let Some(history) = &self.history else {
            tracing::debug!("History disabled; send attempt not recorded");
            return;
        };
        if let Err(err) = history.append(record) {
            tracing::warn!(error = %err, to = %record.to, "Could not save message to history");
        }
    }
}

impl<S> Clone for GatewayState<S>
where
    S: HistoryStore,
{
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            history: self.history.clone(),
            restarter: Arc::clone(&self.restarter),
            config: self.config.clone(),
        }
    }
}
