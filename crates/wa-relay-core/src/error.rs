//! Common error types for wa-relay.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the relay.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The supplied phone number contains no digits.
    #[error("invalid phone number: {0:?}")]
    InvalidPhone(String),
}
