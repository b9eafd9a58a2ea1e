//! WhatsApp automation-client lifecycle management for wa-relay.
//!
//! The actual WhatsApp session (browser automation, protocol, crypto) lives
//! in an external automation host. This crate owns the one piece of state the
//! relay keeps about it: which client handle is active, whether it is ready,
//! and the pairing code it is currently showing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Gateway (HTTP)                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LifecycleManager                         │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │  State      │ │  Event      │ │   Session-store     │   │
//! │  │  Machine    │ │  Dispatch   │ │   Resilience        │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ AutomationClient
//!                              ▼
//!                    ┌──────────────────┐
//!                    │  Automation host │
//!                    │  (HTTP + WS)     │
//!                    └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use wa_relay_client::{
//!     BridgeClientFactory, ClientOptions, LifecycleConfig, LifecycleManager, SessionDir,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = Arc::new(BridgeClientFactory::new("http://127.0.0.1:3100")?);
//! let session = SessionDir::new(".wa_session");
//! let options = ClientOptions::new(session.path());
//!
//! let manager = LifecycleManager::new(factory, session, options, LifecycleConfig::default());
//! let client = manager.initialize().await?;
//! assert!(manager.is_ready());
//! # drop(client);
//! # Ok(())
//! # }
//! ```
//!
//! # State Machine
//!
//! - `Uninitialized` → `Initializing` (handle created)
//! - `Initializing` → `AwaitingPairing` (pairing code) or `Ready`
//! - `AwaitingPairing` → `AwaitingPairing` (code rotated) or `Ready`
//! - `Ready` / `AwaitingPairing` / `Initializing` → `Disconnected`
//! - any live state → `Terminated` (restart) → `Uninitialized`
//!
//! See the [`lifecycle`] module for the transition table.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod bridge;
pub mod client;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod manager;
pub mod session;
pub mod supervise;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use auth::{AuthStrategy, LocalAuth, ResilientAuth};
pub use bridge::{BridgeClient, BridgeClientFactory};
pub use client::{AutomationClient, ClientFactory, ClientHandle, ClientOptions};
pub use error::{ClientError, Result};
pub use event::{ClientEvent, EventSink};
pub use lifecycle::ConnectionState;
pub use manager::LifecycleManager;
pub use session::{CleanupOutcome, SessionDir, CLEANUP_MARKER};
pub use supervise::{is_resource_busy_message, report_background_error, spawn_supervised};
pub use types::LifecycleConfig;

pub use wa_relay_core::ChatId;
