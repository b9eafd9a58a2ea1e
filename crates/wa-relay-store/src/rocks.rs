//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksHistoryStore` implementation of the `HistoryStore` trait.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{DeliveryStatus, HistoryFilter, HistoryStats, MessageRecord};
use crate::HistoryStore;

/// RocksDB-backed send-history log.
pub struct RocksHistoryStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksHistoryStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Visit every record in key order (oldest first, or newest first when
    /// `newest_first` is set) until `visit` returns false.
    fn scan<F>(&self, newest_first: bool, mut visit: F) -> Result<()>
    where
        F: FnMut(MessageRecord) -> bool,
    {
        let cf = self.cf(cf::MESSAGES)?;
        let mode = if newest_first {
            IteratorMode::End
        } else {
            IteratorMode::Start
        };

        for item in self.db.iterator_cf(&cf, mode) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let record: MessageRecord = Self::deserialize(&value)?;
            if !visit(record) {
                break;
            }
        }

        Ok(())
    }
}

impl HistoryStore for RocksHistoryStore {
    fn append(&self, record: &MessageRecord) -> Result<()> {
        let cf = self.cf(cf::MESSAGES)?;
        let key = keys::message_key(record.timestamp, &record.id);
        let value = Self::serialize(record)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(
            message_id = %record.id,
            status = record.status.as_str(),
            "Recorded send attempt"
        );
        Ok(())
    }

    fn query(&self, filter: &HistoryFilter) -> Result<Vec<MessageRecord>> {
        let mut records = Vec::new();
        if filter.limit == 0 {
            return Ok(records);
        }

        self.scan(true, |record| {
            if filter.matches(&record) {
                records.push(record);
            }
            records.len() < filter.limit
        })?;

        Ok(records)
    }

    fn stats(&self, filter: &HistoryFilter) -> Result<HistoryStats> {
        let mut stats = HistoryStats::default();

        self.scan(false, |record| {
            if filter.matches_phone(&record) {
                match record.status {
                    DeliveryStatus::Sent => stats.sent += 1,
                    DeliveryStatus::Failed => stats.failed += 1,
                }
                if filter.matches(&record) {
                    stats.total += 1;
                }
            }
            true
        })?;

        Ok(stats)
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let cf = self.cf(cf::MESSAGES)?;
        let cutoff_millis = u64::from_be_bytes(keys::timestamp_prefix(cutoff));

        let mut batch = WriteBatch::default();
        let mut deleted = 0u64;

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Keys are time ordered; everything after this one is newer.
            if keys::extract_timestamp_millis(&key)? >= cutoff_millis {
                break;
            }

            batch.delete_cf(&cf, &key);
            deleted += 1;
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(deleted, cutoff = %cutoff, "Deleted old history records");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksHistoryStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksHistoryStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn record_at(to: &str, status: DeliveryStatus, age: Duration) -> MessageRecord {
        let mut record = match status {
            DeliveryStatus::Sent => MessageRecord::sent(to, "hello"),
            DeliveryStatus::Failed => MessageRecord::failed(to, "hello", "send failed"),
        };
        record.timestamp = Utc::now() - age;
        record
    }

    #[test]
    fn append_and_query() {
        let (store, _dir) = create_test_store();
        let record = MessageRecord::sent("5491123456789", "hi");

        store.append(&record).unwrap();

        let records = store.query(&HistoryFilter::default()).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn query_returns_newest_first_and_honours_limit() {
        let (store, _dir) = create_test_store();
        for minutes in [30, 10, 20, 40] {
            store
                .append(&record_at(
                    "111",
                    DeliveryStatus::Sent,
                    Duration::minutes(minutes),
                ))
                .unwrap();
        }

        let filter = HistoryFilter {
            limit: 3,
            ..HistoryFilter::default()
        };
        let records = store.query(&filter).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].timestamp > records[1].timestamp);
        assert!(records[1].timestamp > records[2].timestamp);
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let (store, _dir) = create_test_store();
        store.append(&MessageRecord::sent("1", "a")).unwrap();

        let filter = HistoryFilter {
            limit: 0,
            ..HistoryFilter::default()
        };
        assert!(store.query(&filter).unwrap().is_empty());
    }

    #[test]
    fn status_and_phone_filters() {
        let (store, _dir) = create_test_store();
        store
            .append(&record_at("5491111", DeliveryStatus::Sent, Duration::minutes(3)))
            .unwrap();
        store
            .append(&record_at("5491111", DeliveryStatus::Failed, Duration::minutes(2)))
            .unwrap();
        store
            .append(&record_at("5492222", DeliveryStatus::Failed, Duration::minutes(1)))
            .unwrap();

        let failed = HistoryFilter {
            status: Some(DeliveryStatus::Failed),
            ..HistoryFilter::default()
        };
        let records = store.query(&failed).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == DeliveryStatus::Failed));

        let by_phone = HistoryFilter {
            phone: Some("1111".into()),
            ..HistoryFilter::default()
        };
        assert_eq!(store.query(&by_phone).unwrap().len(), 2);
    }

    #[test]
    fn stats_counts() {
        let (store, _dir) = create_test_store();
        store
            .append(&record_at("5491111", DeliveryStatus::Sent, Duration::minutes(3)))
            .unwrap();
        store
            .append(&record_at("5491111", DeliveryStatus::Failed, Duration::minutes(2)))
            .unwrap();
        store
            .append(&record_at("5492222", DeliveryStatus::Failed, Duration::minutes(1)))
            .unwrap();

        let all = store.stats(&HistoryFilter::default()).unwrap();
        assert_eq!(
            all,
            HistoryStats {
                total: 3,
                sent: 1,
                failed: 2
            }
        );

        let failed = HistoryFilter {
            status: Some(DeliveryStatus::Failed),
            ..HistoryFilter::default()
        };
        let stats = store.stats(&failed).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.failed, 2);

        let by_phone = HistoryFilter {
            phone: Some("2222".into()),
            ..HistoryFilter::default()
        };
        let stats = store.stats(&by_phone).unwrap();
        assert_eq!(
            stats,
            HistoryStats {
                total: 1,
                sent: 0,
                failed: 1
            }
        );
    }

    #[test]
    fn delete_older_than_cutoff() {
        let (store, _dir) = create_test_store();
        store
            .append(&record_at("1", DeliveryStatus::Sent, Duration::days(45)))
            .unwrap();
        store
            .append(&record_at("2", DeliveryStatus::Failed, Duration::days(31)))
            .unwrap();
        let recent = record_at("3", DeliveryStatus::Sent, Duration::days(2));
        store.append(&recent).unwrap();

        let deleted = store
            .delete_older_than(Utc::now() - Duration::days(30))
            .unwrap();
        assert_eq!(deleted, 2);

        let remaining = store.query(&HistoryFilter::default()).unwrap();
        assert_eq!(remaining, vec![recent]);
    }

    #[test]
    fn delete_on_empty_store() {
        let (store, _dir) = create_test_store();
        assert_eq!(store.delete_older_than(Utc::now()).unwrap(), 0);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let record = MessageRecord::failed("42", "body", "offline");
        {
            let store = RocksHistoryStore::open(dir.path()).unwrap();
            store.append(&record).unwrap();
        }

        let store = RocksHistoryStore::open(dir.path()).unwrap();
        let records = store.query(&HistoryFilter::default()).unwrap();
        assert_eq!(records, vec![record]);
    }
}
