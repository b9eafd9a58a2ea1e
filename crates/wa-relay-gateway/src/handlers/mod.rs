//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

pub mod docs;
pub mod health;
pub mod history;
pub mod messages;
pub mod qr;
