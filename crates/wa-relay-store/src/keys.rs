//! Key encoding utilities for `RocksDB`.
//!
//! Message keys are `timestamp_millis (u64, big endian) || message_id (16 bytes)`.
//! Big-endian timestamps sort lexicographically in time order, which lets
//! history queries walk the column family backwards for newest-first results
//! and lets retention cleanup stop at the first key past the cutoff.

use chrono::{DateTime, Utc};
use wa_relay_core::MessageId;

use crate::error::{Result, StoreError};

/// Length of an encoded message key.
pub const MESSAGE_KEY_LEN: usize = 24;

/// Encode a timestamp as the 8-byte big-endian key prefix.
///
/// Timestamps before the Unix epoch clamp to zero.
#[must_use]
pub fn timestamp_prefix(timestamp: DateTime<Utc>) -> [u8; 8] {
    let millis = u64::try_from(timestamp.timestamp_millis()).unwrap_or(0);
    millis.to_be_bytes()
}

/// Encode a message key: `timestamp_millis || message_id`.
#[must_use]
pub fn message_key(timestamp: DateTime<Utc>, message_id: &MessageId) -> Vec<u8> {
    let mut key = Vec::with_capacity(MESSAGE_KEY_LEN);
    key.extend_from_slice(&timestamp_prefix(timestamp));
    key.extend_from_slice(message_id.as_bytes());
    key
}

/// Extract the millisecond timestamp from a message key.
///
/// # Errors
///
/// Returns `StoreError::MalformedKey` if the key is not a message key.
pub fn extract_timestamp_millis(key: &[u8]) -> Result<u64> {
    if key.len() != MESSAGE_KEY_LEN {
        return Err(StoreError::MalformedKey(key.len()));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[..8]);
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn message_key_layout() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let id = MessageId::from_bytes([9u8; 16]);

        let key = message_key(ts, &id);
        assert_eq!(key.len(), MESSAGE_KEY_LEN);
        assert_eq!(extract_timestamp_millis(&key).unwrap(), 1_700_000_000_123);
        assert_eq!(&key[8..], id.as_bytes());
    }

    #[test]
    fn keys_sort_chronologically() {
        let earlier = Utc.timestamp_millis_opt(1_000).unwrap();
        let later = earlier + Duration::days(400);

        // A larger id must not outweigh an earlier timestamp.
        let a = message_key(earlier, &MessageId::from_bytes([0xff; 16]));
        let b = message_key(later, &MessageId::from_bytes([0x00; 16]));
        assert!(a < b);
    }

    #[test]
    fn pre_epoch_clamps_to_zero() {
        let ts = Utc.timestamp_millis_opt(-5_000).unwrap();
        assert_eq!(timestamp_prefix(ts), [0u8; 8]);
    }

    #[test]
    fn short_key_is_rejected() {
        assert!(matches!(
            extract_timestamp_millis(&[1, 2, 3]),
            Err(StoreError::MalformedKey(3))
        ));
    }
}
