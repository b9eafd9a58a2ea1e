//! Core types and utilities for wa-relay.
//!
//! This crate provides the foundational types used throughout the relay:
//!
//! - **Identifiers**: Strongly-typed IDs for persisted message records
//! - **Addressing**: Normalization of caller-supplied phone numbers into chat IDs
//! - **Error types**: Common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use wa_relay_core::{ChatId, MessageId};
//!
//! // Normalize a phone number into a WhatsApp chat ID
//! let chat = ChatId::from_phone("+54 9 11 2345-6789").unwrap();
//! assert_eq!(chat.as_str(), "5491123456789@c.us");
//!
//! // Generate a message ID
//! let message_id = MessageId::generate();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod chat;
pub mod error;
pub mod ids;

pub use chat::ChatId;
pub use error::{CoreError, Result};
pub use ids::{IdError, MessageId};
