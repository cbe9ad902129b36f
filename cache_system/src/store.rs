//! Backing store abstraction
//!
//! `CacheStore` is the seam between the cache service and the remote
//! key/value backend. Every method reports failures as `CacheError`;
//! turning those into safe defaults is the service's job.

use crate::errors::CacheError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One page of a cursor-based key scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next page, `0` once the scan is complete
    pub cursor: u64,
    pub keys: Vec<String>,
}

/// Backend statistics reported by `CacheStore::info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub memory_used: String,
    pub connected_clients: u64,
    pub uptime_days: u64,
}

impl Default for StoreInfo {
    fn default() -> Self {
        Self {
            memory_used: "N/A".to_string(),
            connected_clients: 0,
            uptime_days: 0,
        }
    }
}

/// Key/value store with TTL semantics
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open the connection and verify it with a liveness check
    async fn connect(&self) -> Result<(), CacheError>;

    /// Release the connection; safe to call when never connected
    async fn disconnect(&self) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl_seconds`, in one atomic write
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64)
    -> Result<(), CacheError>;

    /// Returns whether a key was removed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Fetch one page of keys matching the glob `pattern`, starting at `cursor`
    async fn scan(&self, pattern: &str, cursor: u64, count: usize)
    -> Result<ScanPage, CacheError>;

    /// Returns the number of keys removed
    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError>;

    async fn info(&self) -> Result<StoreInfo, CacheError>;
}

/// Restartable paged iterator over keys matching a pattern.
///
/// Pages are pulled one at a time, so the keyspace is never loaded at once.
/// A scan can be abandoned between pages and later resumed from
/// [`KeyScan::cursor`] with [`KeyScan::resume`].
pub struct KeyScan<'a> {
    store: &'a dyn CacheStore,
    pattern: String,
    page_size: usize,
    cursor: u64,
    finished: bool,
}

impl<'a> KeyScan<'a> {
    pub fn new(store: &'a dyn CacheStore, pattern: impl Into<String>, page_size: usize) -> Self {
        Self::resume(store, pattern, page_size, 0)
    }

    /// Continue a scan from a cursor returned by an earlier page
    pub fn resume(
        store: &'a dyn CacheStore,
        pattern: impl Into<String>,
        page_size: usize,
        cursor: u64,
    ) -> Self {
        Self {
            store,
            pattern: pattern.into(),
            page_size: page_size.max(1),
            cursor,
            finished: false,
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetch the next page. Returns `None` after the page carrying cursor `0`.
    ///
    /// Pages may be empty while the scan is still in progress. A failed page
    /// leaves the cursor untouched so the same page can be retried.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>, CacheError> {
        if self.finished {
            return Ok(None);
        }

        let page = self
            .store
            .scan(&self.pattern, self.cursor, self.page_size)
            .await?;

        self.cursor = page.cursor;
        if page.cursor == 0 {
            self.finished = true;
        }
        Ok(Some(page.keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_scan_resumes_from_cursor() {
        let store = MemoryStore::new();
        store.connect().await.unwrap();
        for i in 0..5 {
            store.insert_raw(format!("app:{}", i), "v");
        }
        store.insert_raw("other:1", "v");

        let mut scan = KeyScan::new(&store, "app:*", 2);
        let first = scan.next_page().await.unwrap().unwrap();
        assert_eq!(first, vec!["app:0", "app:1"]);
        let cursor = scan.cursor();
        assert_ne!(cursor, 0);
        drop(scan);

        let mut resumed = KeyScan::resume(&store, "app:*", 2, cursor);
        let mut rest = Vec::new();
        while let Some(page) = resumed.next_page().await.unwrap() {
            rest.extend(page);
        }
        assert_eq!(rest, vec!["app:2", "app:3", "app:4"]);
        assert!(resumed.is_finished());
        assert_eq!(resumed.next_page().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_page_keeps_cursor() {
        let store = MemoryStore::new();
        store.connect().await.unwrap();
        store.set_available(false);

        let mut scan = KeyScan::new(&store, "app:*", 10);
        assert!(scan.next_page().await.is_err());
        assert_eq!(scan.cursor(), 0);
        assert!(!scan.is_finished());
    }
}
