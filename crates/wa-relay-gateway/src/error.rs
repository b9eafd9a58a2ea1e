//! API error types and responses.
//!
//! Every failure leaves the gateway as `{"success": false, "error": "..."}`
//! with a status code chosen by [`ApiError::status_code`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use wa_relay_core::CoreError;
use wa_relay_store::StoreError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request body or parameters.
    #[error("{0}")]
    BadRequest(String),

    /// The WhatsApp client has not completed its handshake.
    #[error("WhatsApp client is not connected. Scan the QR code first.")]
    NotReady,

    /// The automation client failed to deliver the message.
    #[error("Failed to send message: {0}")]
    SendFailed(String),

    /// The history database is missing or not responding.
    #[error("History database is not available. Check HISTORY_DB_PATH.")]
    HistoryUnavailable,

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotReady | Self::HistoryUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::SendFailed(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPhone(_) => {
                Self::BadRequest("phone must contain at least one digit".to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(msg) => {
                tracing::error!(error = %msg, "History database error");
                Self::HistoryUnavailable
            }
            StoreError::Serialization(_) | StoreError::MalformedKey(_) => {
                tracing::error!(error = %err, "History data error");
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotReady.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::SendFailed("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::HistoryUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn send_failure_message_carries_cause() {
        let err = ApiError::SendFailed("chat not found".into());
        assert_eq!(err.to_string(), "Failed to send message: chat not found");
    }

    #[test]
    fn store_errors_map_by_kind() {
        assert!(matches!(
            ApiError::from(StoreError::Database("closed".into())),
            ApiError::HistoryUnavailable
        ));
        assert!(matches!(
            ApiError::from(StoreError::MalformedKey(3)),
            ApiError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn error_body_shape() {
        let response = ApiError::NotReady.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
