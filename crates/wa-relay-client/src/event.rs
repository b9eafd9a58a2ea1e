//! Lifecycle events emitted by the automation client.
//!
//! Each client handle gets its own [`EventSink`]. The manager drains the
//! matching receiver on a dedicated dispatcher task, so events for one handle
//! are applied strictly in emission order.
//!
//! The serde representation doubles as the automation host's wire format:
//!
//! ```text
//! {"event":"qr","data":"2@AbC..."}
//! {"event":"loading_screen","data":{"percent":42,"message":"WhatsApp"}}
//! {"event":"ready"}
//! {"event":"disconnected","data":"NAVIGATION"}
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A lifecycle notification from the automation client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A new pairing code (QR payload) is available. Codes rotate periodically.
    Qr(String),
    /// Progress while WhatsApp Web loads.
    LoadingScreen {
        /// Load progress, 0-100.
        percent: u8,
        /// Message shown by the loading screen.
        message: String,
    },
    /// Stored or scanned credentials were accepted.
    Authenticated,
    /// Credentials were rejected.
    AuthFailure(String),
    /// The client finished its handshake and can send messages.
    Ready,
    /// The client lost its session; the payload is the reported reason.
    Disconnected(String),
    /// A non-fatal error reported by the client.
    Error(String),
}

impl ClientEvent {
    /// Short name of the event, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Qr(_) => "qr",
            Self::LoadingScreen { .. } => "loading_screen",
            Self::Authenticated => "authenticated",
            Self::AuthFailure(_) => "auth_failure",
            Self::Ready => "ready",
            Self::Disconnected(_) => "disconnected",
            Self::Error(_) => "error",
        }
    }
}

/// Sending half of a client's event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl EventSink {
    /// Wrap the sending half of an event channel.
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self { tx }
    }

    /// Deliver an event to the manager.
    ///
    /// Returns false once the manager has stopped listening to this handle.
    pub fn emit(&self, event: ClientEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Returns true once the manager has stopped listening to this handle.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
