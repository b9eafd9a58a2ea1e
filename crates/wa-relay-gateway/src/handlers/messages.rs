//! Message endpoints.
//!
//! Sending, connection status and restarts. The QR endpoint lives in
//! [`super::qr`].

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use wa_relay_client::{spawn_supervised, ChatId};
use wa_relay_store::{HistoryStore, MessageRecord};

use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to send a message.
///
/// Both fields are optional at the parsing level so a missing field yields
/// the same 400 as an empty one.
#[derive(Debug, Default, Deserialize)]
pub struct SendMessageBody {
    /// Recipient phone number, in any format.
    #[serde(default)]
    pub phone: Option<String>,
    /// Message text.
    #[serde(default)]
    pub message: Option<String>,
}

/// Response for a successful send.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Always true.
    pub success: bool,
    /// Human-readable outcome.
    pub message: &'static str,
    /// Recipient as supplied by the caller.
    pub to: String,
}

/// Response for the status endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Always true.
    pub success: bool,
    /// Whether messages can be sent right now.
    pub ready: bool,
    /// Human-readable status.
    pub message: &'static str,
    /// Whether a pairing code is waiting to be scanned.
    pub qr_available: bool,
}

/// Response for actions that only report success.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    /// Always true.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Additional detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Send a text message through the WhatsApp client.
///
/// Every attempt that reaches the client is recorded in the history,
/// successful or not, even if the request itself times out. History
/// failures never fail the request.
///
/// # Errors
///
/// - 400 if `phone` or `message` is missing or empty
/// - 503 if the client is not ready
/// - 500 if the client failed to send
pub async fn send_message<S>(
    State(state): State<Arc<GatewayState<S>>>,
    body: Result<Json<SendMessageBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    S: HistoryStore + 'static,
{
    let Json(body) = body?;

    let (Some(phone), Some(message)) = (
        body.phone.filter(|p| !p.is_empty()),
        body.message.filter(|m| !m.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "\"phone\" and \"message\" are required".to_string(),
        ));
    };
    let chat_id = ChatId::from_phone(&phone)?;

    if !state.manager.is_ready() {
        return Err(ApiError::NotReady);
    }
    let client = state.manager.handle().ok_or(ApiError::NotReady)?;

    // The send and its history record run detached, so a request timeout
    // cannot drop an attempt the host may already have delivered
    let recorder = Arc::clone(&state);
    let attempt = tokio::spawn(async move {
        match client.send_message(&chat_id, &message).await {
            Ok(()) => {
                tracing::info!(chat_id = %chat_id, "Message sent");
                recorder.record(&MessageRecord::sent(phone.clone(), message));
                Ok(phone)
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::error!(chat_id = %chat_id, error = %reason, "Failed to send message");
                recorder.record(&MessageRecord::failed(phone, message, reason.clone()));
                Err(ApiError::SendFailed(reason))
            }
        }
    });

    let to = attempt
        .await
        .map_err(|e| ApiError::Internal(format!("send task failed: {e}")))??;

    Ok(Json(SendMessageResponse {
        success: true,
        message: "Message sent successfully",
        to,
    }))
}

/// Report whether the client is ready and whether a pairing code is available.
pub async fn status<S>(State(state): State<Arc<GatewayState<S>>>) -> impl IntoResponse
where
    S: HistoryStore + 'static,
{
    let ready = state.manager.is_ready();
    let message = if ready {
        "WhatsApp client connected and ready"
    } else {
        "WhatsApp client is not ready. Scan the QR code."
    };

    Json(StatusResponse {
        success: true,
        ready,
        message,
        qr_available: state.manager.current_pairing_code().is_some(),
    })
}

/// Restart the WhatsApp client in the background.
///
/// Responds immediately; progress shows up in the status endpoint.
pub async fn restart_client<S>(State(state): State<Arc<GatewayState<S>>>) -> impl IntoResponse
where
    S: HistoryStore + 'static,
{
    tracing::info!("Client restart requested");

    let manager = Arc::clone(&state.manager);
    spawn_supervised("client restart", async move {
        manager.restart().await.map(|_| ())
    });

    Json(ActionResponse {
        success: true,
        message: "WhatsApp client restart initiated".to_string(),
        note: None,
    })
}

/// Exit the process after a short delay so its supervisor restarts it.
///
/// # Errors
///
/// Returns 500 if the exit could not be scheduled.
pub async fn restart_server<S>(
    State(state): State<Arc<GatewayState<S>>>,
) -> Result<impl IntoResponse, ApiError>
where
    S: HistoryStore + 'static,
{
    tracing::info!("Server restart requested");

    let delay = state.config.restart_delay();
    state
        .restarter
        .schedule_restart(delay)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ActionResponse {
        success: true,
        message: "Server restarting...".to_string(),
        note: Some(format!(
            "The server will restart in {} seconds.",
            delay.as_secs()
        )),
    }))
}
