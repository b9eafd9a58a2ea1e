//! Connection lifecycle state machine.
//!
//! This module defines the connection states of the active client handle and
//! the transitions driven by client events and manager operations.
//!
//! # State Machine
//!
//! ```text
//!     ┌───────────────┐
//!     │ Uninitialized │◄──────────────────────────────┐
//!     └───────┬───────┘                               │
//!             │ (handle created)                      │ (state cleared)
//!             ▼                                       │
//!     ┌───────────────┐   (qr)   ┌─────────────────┐  │
//!     │ Initializing  │─────────▶│ AwaitingPairing │◄─┐ (qr rotated)
//!     └───────┬───────┘          └────┬───────┬────┘──┘
//!             │ (ready)               │ ready │       │
//!             ▼                       ▼       │       │
//!     ┌───────────────┐◄──────────────┘       │       │
//!     │     Ready     │                       │       │
//!     └───────┬───────┘                       │       │
//!             │ (disconnected)                │       │
//!             ▼                               │       │
//!     ┌───────────────┐◄──────────────────────┘       │
//!     │ Disconnected  │                               │
//!     └───────┬───────┘                               │
//!             │ (restart)                             │
//!             ▼                                       │
//!     ┌───────────────┐                               │
//!     │  Terminated   │───────────────────────────────┘
//!     └───────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::event::ClientEvent;

/// Connection states of the active client handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No handle has been created.
    Uninitialized,
    /// Handle created and asked to initialize; no pairing code yet.
    Initializing,
    /// The client is showing a pairing code.
    AwaitingPairing,
    /// Handshake complete; messages can be sent.
    Ready,
    /// The client lost its session.
    Disconnected,
    /// The manager destroyed the handle as part of a restart.
    Terminated,
}

/// Compute the state reached when `event` arrives in state `from`.
///
/// Returns `None` when the event does not change the state (informational
/// events, or events that make no sense in the current state).
#[must_use]
pub const fn transition(from: ConnectionState, event: &ClientEvent) -> Option<ConnectionState> {
    use ConnectionState::{AwaitingPairing, Disconnected, Initializing, Ready};

    match (from, event) {
        // A disconnected client may re-pair or reconnect on its own
        (Initializing | AwaitingPairing | Disconnected, ClientEvent::Qr(_)) => {
            Some(AwaitingPairing)
        }
        (Initializing | AwaitingPairing | Disconnected, ClientEvent::Ready) => Some(Ready),
        (
            Initializing | AwaitingPairing | Ready,
            ClientEvent::Disconnected(_) | ClientEvent::AuthFailure(_),
        ) => Some(Disconnected),
        _ => None,
    }
}

/// Check if a state transition is valid according to the state machine.
///
/// Covers both event-driven transitions and the ones the manager performs
/// itself (handle creation, termination, reset).
#[must_use]
pub const fn is_valid_transition(from: ConnectionState, to: ConnectionState) -> bool {
    use ConnectionState::{
        AwaitingPairing, Disconnected, Initializing, Ready, Terminated, Uninitialized,
    };

    matches!(
        (from, to),
        // Handle creation
        (Uninitialized, Initializing)
            // Pairing and readiness
            | (Initializing | AwaitingPairing | Disconnected, AwaitingPairing | Ready)
            // Session loss
            | (Initializing | AwaitingPairing | Ready, Disconnected)
            // Restart teardown and reset
            | (Initializing | AwaitingPairing | Ready | Disconnected, Terminated)
            | (Terminated | Uninitialized, Uninitialized)
    )
}

/// Returns true if the client can send messages in this state.
#[must_use]
pub const fn accepts_messages(state: ConnectionState) -> bool {
    matches!(state, ConnectionState::Ready)
}

/// Returns true if a pairing code is exposed in this state.
#[must_use]
pub const fn exposes_pairing_code(state: ConnectionState) -> bool {
    matches!(state, ConnectionState::AwaitingPairing)
}

/// Returns true if a client handle is installed in this state.
#[must_use]
pub const fn has_live_handle(state: ConnectionState) -> bool {
    matches!(
        state,
        ConnectionState::Initializing
            | ConnectionState::AwaitingPairing
            | ConnectionState::Ready
            | ConnectionState::Disconnected
    )
}
