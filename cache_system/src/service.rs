//! Fail-open response cache service
//!
//! This module provides the CacheService struct, which ties key derivation,
//! the JSON codec and a `CacheStore` together. Nothing here returns an error
//! to the caller: a broken or slow store turns into a cache miss, a `false`,
//! or a disabled cache, so the feature being accelerated keeps working.

use crate::codec;
use crate::errors::CacheError;
use crate::keys::KeyDeriver;
use crate::params::CacheParams;
use crate::redis_store::RedisStore;
use crate::stats::CacheStats;
use crate::store::{CacheStore, KeyScan};
use config::CacheConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Process-wide response cache.
///
/// Construct once at startup, wrap in an `Arc` and share. `enabled` and
/// `connected` only change in `connect`/`disconnect`; request paths just
/// read them.
pub struct CacheService {
    config: CacheConfig,
    keys: KeyDeriver,
    store: Arc<dyn CacheStore>,
    enabled: AtomicBool,
    connected: AtomicBool,
}

impl Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("config", &self.config)
            .field("enabled", &self.is_enabled())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl CacheService {
    /// Create a service over an explicit store
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self {
            keys: KeyDeriver::new(config.key_prefix.clone()),
            enabled: AtomicBool::new(config.enabled),
            connected: AtomicBool::new(false),
            config,
            store,
        }
    }

    /// Create a service backed by Redis at `config.redis_url`
    pub fn from_config(config: CacheConfig) -> Self {
        let store = Arc::new(RedisStore::new(config.redis_url.clone()));
        Self::new(config, store)
    }

    /// Connect to the store. On failure the cache is disabled for the rest
    /// of the process; the error is logged, never returned.
    pub async fn connect(&self) {
        if !self.is_enabled() {
            return;
        }

        let attempt = tokio::time::timeout(self.config.connection_timeout(), self.store.connect())
            .await
            .unwrap_or(Err(CacheError::Timeout));

        match attempt {
            Ok(()) => {
                self.connected.store(true, Ordering::SeqCst);
                info!(prefix = %self.keys.prefix(), "Connected to response cache");
            }
            Err(e) => {
                self.enabled.store(false, Ordering::SeqCst);
                warn!(error = %e, "Response cache connection failed, caching disabled");
            }
        }
    }

    /// Release the store connection. Idempotent.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self.store.disconnect().await {
            warn!(error = %e, "Error while disconnecting response cache");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Enabled and holding a connection
    fn is_active(&self) -> bool {
        self.is_enabled() && self.is_connected()
    }

    /// Get current configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The key `operation` with `params` is stored under
    pub fn key_for(&self, operation: &str, params: &CacheParams) -> Result<String, CacheError> {
        self.keys.derive(operation, params)
    }

    /// Effective TTL: a missing or zero TTL falls back to the configured default
    pub fn effective_ttl(&self, ttl: Option<u64>) -> u64 {
        ttl.filter(|ttl| *ttl > 0)
            .unwrap_or(self.config.default_ttl)
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        bounded(self.config.timeout(), call).await
    }

    /// Look up a cached result; any failure is a miss
    pub async fn get<T>(&self, operation: &str, params: &CacheParams) -> Option<T>
    where
        T: DeserializeOwned,
    {
        if !self.is_active() {
            return None;
        }

        match self.try_get(operation, params).await {
            Ok(Some(value)) => {
                debug!(operation, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(operation, "Cache miss");
                None
            }
            Err(e) => {
                warn!(operation, error = %e, "Cache get error");
                None
            }
        }
    }

    async fn try_get<T>(&self, operation: &str, params: &CacheParams) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        let key = self.keys.derive(operation, params)?;
        match self.bounded(self.store.get(&key)).await? {
            Some(text) => Ok(Some(codec::decode(&text)?)),
            None => Ok(None),
        }
    }

    /// Store a result; `false` means it was not cached, not that the request failed
    pub async fn set<T>(
        &self,
        operation: &str,
        value: &T,
        ttl: Option<u64>,
        params: &CacheParams,
    ) -> bool
    where
        T: Serialize + ?Sized,
    {
        if !self.is_active() {
            return false;
        }

        let ttl = self.effective_ttl(ttl);
        match self.try_set(operation, value, ttl, params).await {
            Ok(()) => {
                debug!(operation, ttl, "Cached result");
                true
            }
            Err(e) => {
                warn!(operation, error = %e, "Cache set error");
                false
            }
        }
    }

    async fn try_set<T>(
        &self,
        operation: &str,
        value: &T,
        ttl: u64,
        params: &CacheParams,
    ) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let key = self.keys.derive(operation, params)?;
        let text = codec::encode(value)?;
        self.bounded(self.store.set_with_ttl(&key, &text, ttl)).await
    }

    /// Drop one cached result
    pub async fn delete(&self, operation: &str, params: &CacheParams) -> bool {
        if !self.is_active() {
            return false;
        }

        let result = match self.keys.derive(operation, params) {
            Ok(key) => self.bounded(self.store.delete(&key)).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(operation, error = %e, "Cache delete error");
                false
            }
        }
    }

    /// Delete every key under the configured prefix, one scan page at a time.
    ///
    /// Best effort: a failure midway leaves earlier pages deleted and returns
    /// `false`. Dropping the future between pages is safe.
    pub async fn clear_all(&self) -> bool {
        if !self.is_active() {
            return false;
        }

        match self.try_clear_all().await {
            Ok(deleted) => {
                info!(deleted, "Cleared response cache");
                true
            }
            Err(e) => {
                warn!(error = %e, "Cache clear error");
                false
            }
        }
    }

    async fn try_clear_all(&self) -> Result<u64, CacheError> {
        let mut scan = self.scan_owned_keys();
        let mut deleted = 0;

        while let Some(keys) = bounded(self.config.timeout(), scan.next_page()).await? {
            if !keys.is_empty() {
                deleted += self.bounded(self.store.delete_many(&keys)).await?;
            }
        }
        Ok(deleted)
    }

    /// Current cache statistics; failures are reported in `error`
    pub async fn stats(&self) -> CacheStats {
        if !self.is_active() {
            return CacheStats::disabled();
        }

        match self.try_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Cache stats error");
                CacheStats::failed(e)
            }
        }
    }

    async fn try_stats(&self) -> Result<CacheStats, CacheError> {
        let info = self.bounded(self.store.info()).await?;

        let mut scan = self.scan_owned_keys();
        let mut keys = 0u64;
        while let Some(page) = bounded(self.config.timeout(), scan.next_page()).await? {
            keys += page.len() as u64;
        }

        Ok(CacheStats::from_info(info, keys))
    }

    fn scan_owned_keys(&self) -> KeyScan<'_> {
        KeyScan::new(
            self.store.as_ref(),
            self.keys.pattern(),
            self.config.scan_page_size,
        )
    }
}

/// Run a store call under `limit`; running out of time is a `Timeout` error
async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(CacheError::Timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::{ScanPage, StoreInfo};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::AtomicU64;

    fn config() -> CacheConfig {
        CacheConfig::new("redis://unused".to_string(), 3600, "code_assistant".to_string())
    }

    async fn connected_service() -> (Arc<MemoryStore>, CacheService) {
        let store = Arc::new(MemoryStore::new());
        let service = CacheService::new(config(), store.clone());
        service.connect().await;
        assert!(service.is_connected());
        (store, service)
    }

    fn generate_params(context: Option<&str>) -> CacheParams {
        CacheParams::new()
            .with("prompt", "p")
            .with("language", "py")
            .with_optional("context", context)
    }

    /// Store whose calls never complete
    struct StalledStore;

    #[async_trait]
    impl CacheStore for StalledStore {
        async fn connect(&self) -> Result<(), CacheError> {
            Ok(())
        }
        async fn disconnect(&self) -> Result<(), CacheError> {
            Ok(())
        }
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            std::future::pending().await
        }
        async fn set_with_ttl(&self, _: &str, _: &str, _: u64) -> Result<(), CacheError> {
            std::future::pending().await
        }
        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            std::future::pending().await
        }
        async fn scan(&self, _: &str, _: u64, _: usize) -> Result<ScanPage, CacheError> {
            std::future::pending().await
        }
        async fn delete_many(&self, _keys: &[String]) -> Result<u64, CacheError> {
            std::future::pending().await
        }
        async fn info(&self) -> Result<StoreInfo, CacheError> {
            std::future::pending().await
        }
    }

    #[derive(Clone, Copy)]
    enum PageFault {
        Fail,
        Stall,
    }

    /// Memory store whose `delete_many` misbehaves on exactly one call
    struct FaultyPageStore {
        inner: Arc<MemoryStore>,
        fault: PageFault,
        fault_on_call: u64,
        delete_calls: AtomicU64,
    }

    impl FaultyPageStore {
        fn new(inner: Arc<MemoryStore>, fault: PageFault, fault_on_call: u64) -> Self {
            Self {
                inner,
                fault,
                fault_on_call,
                delete_calls: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl CacheStore for FaultyPageStore {
        async fn connect(&self) -> Result<(), CacheError> {
            self.inner.connect().await
        }
        async fn disconnect(&self) -> Result<(), CacheError> {
            self.inner.disconnect().await
        }
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.inner.get(key).await
        }
        async fn set_with_ttl(&self, key: &str, value: &str, ttl: u64) -> Result<(), CacheError> {
            self.inner.set_with_ttl(key, value, ttl).await
        }
        async fn delete(&self, key: &str) -> Result<bool, CacheError> {
            self.inner.delete(key).await
        }
        async fn scan(&self, pattern: &str, cursor: u64, count: usize) -> Result<ScanPage, CacheError> {
            self.inner.scan(pattern, cursor, count).await
        }
        async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
            let call = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fault_on_call {
                match self.fault {
                    PageFault::Fail => {
                        return Err(CacheError::Unavailable("connection reset".into()));
                    }
                    PageFault::Stall => std::future::pending::<()>().await,
                }
            }
            self.inner.delete_many(keys).await
        }
        async fn info(&self) -> Result<StoreInfo, CacheError> {
            self.inner.info().await
        }
    }

    fn fill_owned_keys(store: &MemoryStore, count: usize) {
        for i in 0..count {
            store.insert_raw(format!("code_assistant:generate:{:016x}", i), "{}");
        }
    }

    #[tokio::test]
    async fn test_set_then_get_returns_identical_structure() {
        let (_store, service) = connected_service().await;
        let value = json!({"code": "x=1", "explanation": "e"});

        assert!(service.set("generate", &value, None, &generate_params(Some(""))).await);
        let cached: Option<Value> = service.get("generate", &generate_params(Some(""))).await;
        assert_eq!(cached, Some(value));
    }

    #[tokio::test]
    async fn test_absent_and_empty_optional_hit_same_entry() {
        let (_store, service) = connected_service().await;
        let value = json!({"code": "x=1", "explanation": "e"});

        assert!(service.set("generate", &value, None, &generate_params(Some(""))).await);
        let cached: Option<Value> = service.get("generate", &generate_params(None)).await;
        assert_eq!(cached, Some(value));
    }

    #[tokio::test]
    async fn test_failed_connect_disables_without_further_io() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let service = CacheService::new(config(), store.clone());

        service.connect().await;
        assert!(!service.is_enabled());
        assert_eq!(store.operations(), 1);

        // The store coming back does not re-enable the cache.
        store.set_available(true);
        assert!(!service.set("generate", &json!({"code": "x"}), None, &generate_params(None)).await);
        assert!(service.get::<Value>("generate", &generate_params(None)).await.is_none());
        assert!(!service.delete("generate", &generate_params(None)).await);
        assert!(!service.clear_all().await);
        assert_eq!(service.stats().await, CacheStats::disabled());
        assert_eq!(store.operations(), 1);

        service.connect().await;
        assert_eq!(store.operations(), 1);
    }

    #[tokio::test]
    async fn test_disabled_by_config_never_touches_store() {
        let store = Arc::new(MemoryStore::new());
        let service = CacheService::new(config().with_enabled(false), store.clone());

        service.connect().await;
        assert!(!service.set("explain", &json!({"explanation": "e"}), None, &CacheParams::new()).await);
        assert!(service.get::<Value>("explain", &CacheParams::new()).await.is_none());
        assert!(!service.delete("explain", &CacheParams::new()).await);
        assert_eq!(store.operations(), 0);
    }

    #[tokio::test]
    async fn test_not_connected_short_circuits() {
        let store = Arc::new(MemoryStore::new());
        let service = CacheService::new(config(), store.clone());

        assert!(service.get::<Value>("explain", &CacheParams::new()).await.is_none());
        assert!(!service.set("explain", &json!({}), None, &CacheParams::new()).await);
        assert_eq!(store.operations(), 0);
    }

    #[tokio::test]
    async fn test_store_outage_after_connect_fails_open() {
        let (store, service) = connected_service().await;
        store.set_available(false);

        let params = CacheParams::new().with("code", "x").with("language", "go");
        assert!(service.get::<Value>("explain", &params).await.is_none());
        assert!(!service.set("explain", &json!({"explanation": "e"}), None, &params).await);
        assert!(!service.delete("explain", &params).await);
        assert!(!service.clear_all().await);

        let stats = service.stats().await;
        assert!(stats.enabled);
        assert!(stats.error.is_some());
        assert!(stats.keys.is_none());

        // A mid-flight outage does not disable the service.
        assert!(service.is_enabled());
        store.set_available(true);
        assert!(service.set("explain", &json!({"explanation": "e"}), None, &params).await);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let (store, service) = connected_service().await;
        let params = CacheParams::new().with("code", "x").with("language", "go");
        let key = service.key_for("explain", &params).unwrap();
        store.insert_raw(key, "{truncated");

        assert!(service.get::<Value>("explain", &params).await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_defaults() {
        let (store, service) = connected_service().await;
        assert_eq!(service.effective_ttl(None), 3600);
        assert_eq!(service.effective_ttl(Some(0)), 3600);
        assert_eq!(service.effective_ttl(Some(60)), 60);

        let params = CacheParams::new().with("code", "x");
        assert!(service.set("explain", &json!({"explanation": "e"}), Some(0), &params).await);
        let key = service.key_for("explain", &params).unwrap();
        assert!(store.peek(&key).is_some());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_store, service) = connected_service().await;
        let params = CacheParams::new().with("code", "x").with("language", "rust");
        service.set("explain", &json!({"explanation": "e"}), None, &params).await;

        assert!(service.delete("explain", &params).await);
        assert!(service.get::<Value>("explain", &params).await.is_none());
        // Deleting a missing entry still succeeds.
        assert!(service.delete("explain", &params).await);
    }

    #[tokio::test]
    async fn test_clear_all_pages_through_every_owned_key() {
        let (store, service) = connected_service().await;
        for i in 0..250 {
            store.insert_raw(format!("code_assistant:generate:{:016x}", i), "{}");
        }
        store.insert_raw("sessions:abc", "keep");
        store.insert_raw("code_assistantx:generate:1", "keep");

        assert_eq!(service.stats().await.keys, Some(250));
        assert!(service.clear_all().await);

        assert_eq!(store.len(), 2);
        assert_eq!(store.peek("sessions:abc"), Some("keep".to_string()));
        assert_eq!(store.peek("code_assistantx:generate:1"), Some("keep".to_string()));
        assert_eq!(service.stats().await.keys, Some(0));
    }

    #[tokio::test]
    async fn test_clear_all_failing_midway_keeps_earlier_pages_deleted() {
        let memory = Arc::new(MemoryStore::new());
        fill_owned_keys(&memory, 250);
        let store = Arc::new(FaultyPageStore::new(memory.clone(), PageFault::Fail, 2));
        let service = CacheService::new(config(), store);
        service.connect().await;

        assert!(!service.clear_all().await);
        assert_eq!(memory.len(), 150);
        assert!(service.is_enabled());

        // The fault was one-off; a fresh clear finishes the job.
        assert!(service.clear_all().await);
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_dropped_between_pages() {
        let memory = Arc::new(MemoryStore::new());
        fill_owned_keys(&memory, 250);
        memory.insert_raw("sessions:abc", "keep");
        let store = Arc::new(FaultyPageStore::new(memory.clone(), PageFault::Stall, 2));
        let service = CacheService::new(config().with_timeout(60_000), store);
        service.connect().await;

        let dropped = tokio::time::timeout(Duration::from_millis(50), service.clear_all()).await;
        assert!(dropped.is_err());

        // First page gone, the rest of the owned keys untouched.
        assert_eq!(memory.len(), 151);
        for i in 100..250 {
            let key = format!("code_assistant:generate:{:016x}", i);
            assert_eq!(memory.peek(&key), Some("{}".to_string()));
        }

        assert!(service.clear_all().await);
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.peek("sessions:abc"), Some("keep".to_string()));
    }

    #[tokio::test]
    async fn test_clear_all_with_metacharacter_prefix_stays_in_namespace() {
        for prefix in ["a?b", "a*", "a[b]", "a\\b"] {
            let store = Arc::new(MemoryStore::new());
            let config = CacheConfig::new("redis://unused".to_string(), 3600, prefix.to_string());
            let service = CacheService::new(config, store.clone());
            service.connect().await;

            let params = CacheParams::new().with("code", "x");
            assert!(service.set("explain", &json!({"explanation": "e"}), None, &params).await);
            store.insert_raw("axb:foreign", "keep");
            store.insert_raw("ab:foreign", "keep");
            store.insert_raw("a:foreign", "keep");

            assert_eq!(service.stats().await.keys, Some(1), "{prefix}");
            assert!(service.clear_all().await);
            assert!(service.get::<Value>("explain", &params).await.is_none());
            assert_eq!(store.len(), 3, "{prefix} reached a foreign key");
        }
    }

    #[tokio::test]
    async fn test_stats_reports_store_info() {
        let (_store, service) = connected_service().await;
        service
            .set("document", &json!({"documented_code": "d"}), None, &CacheParams::new())
            .await;

        let stats = service.stats().await;
        assert!(stats.enabled);
        assert_eq!(stats.keys, Some(1));
        assert_eq!(stats.connected_clients, Some(1));
        assert!(stats.memory_used.is_some());
        assert!(stats.error.is_none());
    }

    #[tokio::test]
    async fn test_timeouts_are_treated_as_failures() {
        let service = CacheService::new(config().with_timeout(20), Arc::new(StalledStore));
        service.connect().await;
        assert!(service.is_connected());

        let params = CacheParams::new().with("code", "x");
        assert!(service.get::<Value>("explain", &params).await.is_none());
        assert!(!service.set("explain", &json!({}), None, &params).await);
        assert!(!service.clear_all().await);
        assert_eq!(
            service.stats().await.error.as_deref(),
            Some("Cache operation timeout")
        );
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (store, service) = connected_service().await;
        service.disconnect().await;
        service.disconnect().await;
        assert!(!service.is_connected());

        let before = store.operations();
        assert!(service.get::<Value>("explain", &CacheParams::new()).await.is_none());
        assert_eq!(store.operations(), before);

        let never_connected = CacheService::new(config(), Arc::new(MemoryStore::new()));
        never_connected.disconnect().await;
    }
}
