//! Router configuration.
//!
//! This module sets up the axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use wa_relay_store::HistoryStore;

use crate::handlers::{docs, health, history, messages, qr};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Service
/// - `GET /` - Service index
/// - `GET /health` - Health check
/// - `GET /api-docs` - OpenAPI document
///
/// ## Messages
/// - `POST /api/messages/send` - Send a message
/// - `GET /api/messages/status` - Connection status
/// - `GET /api/messages/qr` - Pairing QR code
/// - `POST /api/messages/restart` - Restart the WhatsApp client
/// - `POST /api/messages/restart-server` - Exit for a supervisor restart
///
/// ## History
/// - `GET /api/history` - Query the send history
/// - `DELETE /api/history/clear` - Delete old records
pub fn create_router<S>(state: GatewayState<S>) -> Router
where
    S: HistoryStore + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        // Service
        .route("/", get(docs::index::<S>))
        .route("/health", get(health::health::<S>))
        .route("/api-docs", get(docs::api_docs::<S>))
        // Messages
        .route("/api/messages/send", post(messages::send_message::<S>))
        .route("/api/messages/status", get(messages::status::<S>))
        .route("/api/messages/qr", get(qr::get_qr::<S>))
        .route("/api/messages/restart", post(messages::restart_client::<S>))
        .route(
            "/api/messages/restart-server",
            post(messages::restart_server::<S>),
        )
        // History
        .route("/api/history", get(history::get_history::<S>))
        .route("/api/history/clear", delete(history::clear_history::<S>))
        // Middleware (outermost last: Trace -> CORS -> body limit -> timeout)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
