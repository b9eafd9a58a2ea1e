//! Domain types stored in the database.
//!
//! These types represent the persisted send-history log and the query
//! parameters used to read it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wa_relay_core::MessageId;

/// A single outbound send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique identifier for the record.
    pub id: MessageId,
    /// Recipient exactly as the caller supplied it.
    pub to: String,
    /// Message body.
    pub message: String,
    /// Outcome of the send attempt.
    pub status: DeliveryStatus,
    /// When the attempt completed.
    pub timestamp: DateTime<Utc>,
    /// Error reported by the automation client when the send failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageRecord {
    /// Record a successful send, timestamped now.
    #[must_use]
    pub fn sent(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            to: to.into(),
            message: message.into(),
            status: DeliveryStatus::Sent,
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Record a failed send, timestamped now.
    #[must_use]
    pub fn failed(
        to: impl Into<String>,
        message: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            to: to.into(),
            message: message.into(),
            status: DeliveryStatus::Failed,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Outcome of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DeliveryStatus {
    /// The automation client accepted the message.
    Sent = 1,
    /// The automation client rejected the message or errored.
    Failed = 2,
}

impl DeliveryStatus {
    /// Return the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// Filters for reading the send-history log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Maximum number of records returned by a query.
    pub limit: usize,
    /// Only records with this status.
    pub status: Option<DeliveryStatus>,
    /// Only records whose recipient contains this text (case-insensitive).
    pub phone: Option<String>,
}

impl Default for HistoryFilter {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            status: None,
            phone: None,
        }
    }
}

impl HistoryFilter {
    /// Default number of records returned by a query.
    pub const DEFAULT_LIMIT: usize = 50;

    /// Returns true if the record passes the phone filter.
    #[must_use]
    pub fn matches_phone(&self, record: &MessageRecord) -> bool {
        self.phone.as_deref().is_none_or(|needle| {
            record
                .to
                .to_lowercase()
                .contains(&needle.to_lowercase())
        })
    }

    /// Returns true if the record passes every filter.
    #[must_use]
    pub fn matches(&self, record: &MessageRecord) -> bool {
        self.status.is_none_or(|status| record.status == status) && self.matches_phone(record)
    }
}

/// Aggregate counts over the send-history log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Records matching every filter.
    pub total: u64,
    /// Successful sends matching the phone filter.
    pub sent: u64,
    /// Failed sends matching the phone filter.
    pub failed: u64,
}
