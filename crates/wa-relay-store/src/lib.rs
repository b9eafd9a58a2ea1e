//! `RocksDB` storage layer for the wa-relay send history.
//!
//! Every send attempt that reaches the automation client is recorded here,
//! successful or not. The log is best-effort from the caller's perspective:
//! the gateway never fails a send because the history write failed.
//!
//! # Architecture
//!
//! The storage uses a single column family:
//!
//! - `messages`: Message records, keyed by `timestamp_millis || message_id`
//!   so that key order is chronological order
//!
//! # Example
//!
//! ```no_run
//! use wa_relay_store::{HistoryFilter, HistoryStore, MessageRecord, RocksHistoryStore};
//!
//! let store = RocksHistoryStore::open("/tmp/wa-relay-history").unwrap();
//! store.append(&MessageRecord::sent("5491123456789", "hi")).unwrap();
//!
//! let recent = store.query(&HistoryFilter::default()).unwrap();
//! assert_eq!(recent.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksHistoryStore;
pub use types::{DeliveryStatus, HistoryFilter, HistoryStats, MessageRecord};

use chrono::{DateTime, Utc};

/// The storage trait for the send-history log.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait HistoryStore: Send + Sync {
    /// Append a message record to the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append(&self, record: &MessageRecord) -> Result<()>;

    /// Return the records matching `filter`, newest first, at most `filter.limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn query(&self, filter: &HistoryFilter) -> Result<Vec<MessageRecord>>;

    /// Compute aggregate counts for `filter`.
    ///
    /// `total` honours every filter. `sent` and `failed` honour the phone
    /// filter only, with the status forced to the respective value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn stats(&self, filter: &HistoryFilter) -> Result<HistoryStats>;

    /// Delete every record with a timestamp strictly before `cutoff`.
    ///
    /// Returns the number of deleted records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
