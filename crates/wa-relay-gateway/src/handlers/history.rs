//! Send-history endpoints.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wa_relay_store::{DeliveryStatus, HistoryFilter, HistoryStats, HistoryStore, MessageRecord};

use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for history retrieval.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of records (default: 50).
    #[serde(default)]
    pub limit: Option<usize>,
    /// `sent` or `failed`.
    #[serde(default)]
    pub status: Option<String>,
    /// Case-insensitive substring of the recipient.
    #[serde(default)]
    pub phone: Option<String>,
}

impl HistoryQuery {
    /// Convert into a store filter. Empty values count as absent.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` for an unknown status.
    pub fn into_filter(self) -> Result<HistoryFilter, ApiError> {
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some("sent") => Some(DeliveryStatus::Sent),
            Some("failed") => Some(DeliveryStatus::Failed),
            Some(other) => {
                return Err(ApiError::BadRequest(format!(
                    "status must be \"sent\" or \"failed\", got {other:?}"
                )))
            }
        };

        Ok(HistoryFilter {
            limit: self.limit.unwrap_or(HistoryFilter::DEFAULT_LIMIT),
            status,
            phone: self.phone.filter(|p| !p.is_empty()),
        })
    }
}

/// Query parameters for history cleanup.
#[derive(Debug, Default, Deserialize)]
pub struct ClearQuery {
    /// Age threshold in days (default: 30).
    #[serde(default)]
    pub days: Option<u32>,
}

const DEFAULT_RETENTION_DAYS: u32 = 30;

/// A history record as returned by the API.
#[derive(Debug, Serialize)]
pub struct MessageEntry {
    /// Record ID.
    pub id: String,
    /// Recipient as supplied by the caller.
    pub to: String,
    /// Message body.
    pub message: String,
    /// `sent` or `failed`.
    pub status: DeliveryStatus,
    /// When the attempt completed.
    pub timestamp: DateTime<Utc>,
    /// Error reported by the client, for failed sends.
    pub error: Option<String>,
}

impl From<MessageRecord> for MessageEntry {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id.to_string(),
            to: record.to,
            message: record.message,
            status: record.status,
            timestamp: record.timestamp,
            error: record.error,
        }
    }
}

/// Response for history retrieval.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Always true.
    pub success: bool,
    /// Aggregate counts.
    pub stats: HistoryStats,
    /// Matching records, newest first.
    pub messages: Vec<MessageEntry>,
}

/// Response for history cleanup.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// Always true.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Query the send history.
///
/// # Errors
///
/// - 400 for malformed query parameters
/// - 503 if the history database is unavailable
pub async fn get_history<S>(
    State(state): State<Arc<GatewayState<S>>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    S: HistoryStore + 'static,
{
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let history = state.history.as_ref().ok_or(ApiError::HistoryUnavailable)?;

    let messages = history.query(&filter)?;
    let stats = history.stats(&filter)?;

    Ok(Json(HistoryResponse {
        success: true,
        stats,
        messages: messages.into_iter().map(MessageEntry::from).collect(),
    }))
}

/// Delete history records older than `days` days.
///
/// # Errors
///
/// - 400 for malformed query parameters
/// - 500 if the history database is unavailable or fails
pub async fn clear_history<S>(
    State(state): State<Arc<GatewayState<S>>>,
    query: Result<Query<ClearQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    S: HistoryStore + 'static,
{
    let Query(query) = query?;
    let days = query.days.unwrap_or(DEFAULT_RETENTION_DAYS);

    let history = state
        .history
        .as_ref()
        .ok_or_else(|| ApiError::Internal("history database is not configured".to_string()))?;

    let cutoff = Utc::now()
        .checked_sub_signed(chrono::Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let deleted = history
        .delete_older_than(cutoff)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(deleted, days, "History cleared");

    Ok(Json(ClearResponse {
        success: true,
        message: format!("Deleted {deleted} messages older than {days} days"),
    }))
}
