//! HTTP gateway for the wa-relay WhatsApp relay.
//!
//! This crate exposes the REST surface of the relay:
//!
//! - sending text messages through the active WhatsApp client
//! - connection status and the pairing QR code
//! - client and process restarts
//! - the send-history log
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Callers                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ HTTP
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     wa-relay-gateway                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │   Router    │ │     QR      │ │   Process           │   │
//! │  │ + Handlers  │ │  Rendering  │ │   Restarter         │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                             │
//!                 ▼                             ▼
//!        ┌──────────────────┐          ┌──────────────────┐
//!        │ LifecycleManager │          │  History store   │
//!        │ (wa-relay-client)│          │ (wa-relay-store) │
//!        └──────────────────┘          └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wa_relay_client::{
//!     BridgeClientFactory, ClientOptions, LifecycleConfig, LifecycleManager, SessionDir,
//! };
//! use wa_relay_gateway::{create_router, ExitRestarter, GatewayConfig, GatewayState};
//! use wa_relay_store::RocksHistoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::default();
//!
//! let factory = Arc::new(BridgeClientFactory::new(config.automation_url.as_str())?);
//! let session = SessionDir::new(&config.session_dir);
//! let options = ClientOptions::new(session.path());
//! let manager = Arc::new(LifecycleManager::new(
//!     factory,
//!     session,
//!     options,
//!     LifecycleConfig::default(),
//! ));
//!
//! let history = Some(Arc::new(RocksHistoryStore::open("/tmp/wa-relay-history")?));
//! let listen_addr = config.listen_addr();
//! let state = GatewayState::new(manager, history, Arc::new(ExitRestarter), config);
//!
//! let listener = tokio::net::TcpListener::bind(listen_addr).await?;
//! axum::serve(listener, create_router(state)).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod qr;
pub mod restart;
pub mod routes;
pub mod state;

pub use config::{ConfigError, GatewayConfig};
pub use error::ApiError;
pub use restart::{ExitRestarter, ProcessRestarter, RestartError};
pub use routes::create_router;
pub use state::GatewayState;
