//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use wa_relay_client::ConnectionState;
use wa_relay_store::HistoryStore;

use crate::state::GatewayState;

/// Response for `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Lifecycle state of the WhatsApp client.
    pub client_state: ConnectionState,
    /// Whether the send history is available.
    pub history: bool,
}

/// Report that the HTTP server is up.
///
/// Always 200: a disconnected client or a missing history database does not
/// make the process unhealthy. Both are reported for operators.
pub async fn health<S>(State(state): State<Arc<GatewayState<S>>>) -> impl IntoResponse
where
    S: HistoryStore + 'static,
{
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        client_state: state.manager.state(),
        history: state.history.is_some(),
    })
}
