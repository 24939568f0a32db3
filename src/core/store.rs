//! Cache semantics over a `Storage` backend: one JSON envelope per
//! canonical query key, last-write-wins with a monotonic timestamp check,
//! content-digest comparison for unchanged payloads.

use crate::domain::model::CacheEntry;
use crate::domain::ports::Storage;
use crate::utils::error::{Result, ScrapeError};

const CACHE_SUBDIR: &str = "cache";

/// What a `put` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// New or changed payload written.
    Written,
    /// Same payload digest as the stored entry; timestamp refreshed.
    Refreshed,
    /// Incoming entry was older than the stored one and was dropped.
    Stale,
}

pub struct CacheStore<S: Storage> {
    storage: S,
}

impl<S: Storage> CacheStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn entry_path(key: &str) -> String {
        format!("{}/{}.json", CACHE_SUBDIR, key)
    }

    /// Fetch the stored entry for `key`, or `None` on a miss. An entry
    /// that no longer deserializes counts as a miss so the pipeline
    /// refetches instead of failing the whole request.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let bytes = match self.storage.read_file(&Self::entry_path(key)).await {
            Ok(bytes) => bytes,
            Err(ScrapeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_slice(&bytes) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(key, error = %e, "unreadable cache entry, treating as miss");
                Ok(None)
            }
        }
    }

    /// Store `entry` under `key`. Same-key writes are last-write-wins:
    /// an entry older than the stored one never regresses the cache.
    pub async fn put(&self, key: &str, entry: &CacheEntry) -> Result<PutOutcome> {
        let outcome = match self.get(key).await? {
            Some(existing) if existing.fetched_at > entry.fetched_at => {
                tracing::debug!(key, "dropping write older than stored entry");
                return Ok(PutOutcome::Stale);
            }
            Some(existing) if existing.sha256 == entry.sha256 => {
                tracing::debug!(key, "payload unchanged, refreshing timestamp");
                PutOutcome::Refreshed
            }
            _ => PutOutcome::Written,
        };

        let bytes = serde_json::to_vec_pretty(entry)?;
        self.storage
            .write_file(&Self::entry_path(key), &bytes)
            .await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CachePayload, CaseRecord, CaseStatus};
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ScrapeError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn record(court: &str) -> CachePayload {
        CachePayload::Case(CaseRecord {
            cnr: "MHABC1000123452023".to_string(),
            case_type: None,
            court_name: court.to_string(),
            serial_number: Some(23),
            listed_date: None,
            status: CaseStatus::Listed,
        })
    }

    fn at_hour(hour: u32) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc
            .with_ymd_and_hms(2025, 10, 8, hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_returns_entry() {
        let store = CacheStore::new(MockStorage::default());
        let entry = CacheEntry::new(record("District Court Mumbai"), 3600, at_hour(9));

        let outcome = store.put("cnr-MHABC1000123452023-2025-10-08", &entry).await.unwrap();
        assert_eq!(outcome, PutOutcome::Written);

        let read = store
            .get("cnr-MHABC1000123452023-2025-10-08")
            .await
            .unwrap()
            .expect("entry should exist");
        assert_eq!(read, entry);
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let store = CacheStore::new(MockStorage::default());
        assert!(store.get("cnr-UNKNOWN-2025-10-08").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_write_is_dropped() {
        let store = CacheStore::new(MockStorage::default());
        let newer = CacheEntry::new(record("District Court Mumbai"), 3600, at_hour(10));
        let older = CacheEntry::new(record("High Court Delhi"), 3600, at_hour(9));

        store.put("key", &newer).await.unwrap();
        let outcome = store.put("key", &older).await.unwrap();
        assert_eq!(outcome, PutOutcome::Stale);

        let read = store.get("key").await.unwrap().unwrap();
        assert_eq!(read.payload, record("District Court Mumbai"));
    }

    #[tokio::test]
    async fn test_unchanged_payload_refreshes_timestamp() {
        let store = CacheStore::new(MockStorage::default());
        let first = CacheEntry::new(record("District Court Mumbai"), 3600, at_hour(9));
        let second = CacheEntry::new(record("District Court Mumbai"), 3600, at_hour(10));

        store.put("key", &first).await.unwrap();
        let outcome = store.put("key", &second).await.unwrap();
        assert_eq!(outcome, PutOutcome::Refreshed);

        let read = store.get("key").await.unwrap().unwrap();
        assert_eq!(read.fetched_at, at_hour(10));
    }

    #[tokio::test]
    async fn test_corrupt_entry_reads_as_miss() {
        let storage = MockStorage::default();
        storage
            .write_file(&CacheStore::<MockStorage>::entry_path("key"), b"{not json")
            .await
            .unwrap();

        let store = CacheStore::new(storage);
        assert!(store.get("key").await.unwrap().is_none());
    }
}
