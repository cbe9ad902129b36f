//! Redis-backed cache store
//!
//! This module provides the RedisStore struct, a `CacheStore`
//! over a single multiplexed async connection.

use crate::errors::CacheError;
use crate::store::{CacheStore, ScanPage, StoreInfo};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, InfoDict};
use std::fmt::Debug;
use tokio::sync::RwLock;

/// Redis key/value store.
///
/// The client is opened in `connect`, so a malformed URL shows up as a
/// connection failure rather than a construction error. The multiplexed
/// connection is cloned per call and shared by all tasks.
pub struct RedisStore {
    redis_url: String,
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = match self.connection.try_read() {
            Ok(conn) => {
                if conn.is_some() {
                    "connected"
                } else {
                    "no_connection"
                }
            }
            Err(_) => "lock_busy",
        };

        f.debug_struct("RedisStore")
            .field("redis_url", &self.redis_url)
            .field("connected", &connection_status)
            .finish()
    }
}

impl RedisStore {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            connection: RwLock::new(None),
        }
    }

    pub fn redis_url(&self) -> &str {
        &self.redis_url
    }

    /// Clone the live connection out of the slot
    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        self.connection
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or_else(|| CacheError::Unavailable("Redis connection not established".into()))
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn connect(&self) -> Result<(), CacheError> {
        let client = Client::open(self.redis_url.as_str())?;
        let mut conn = client.get_multiplexed_async_connection().await?;

        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;

        *self.connection.write().await = Some(conn);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), CacheError> {
        // Dropping the last clone closes the socket.
        self.connection.write().await.take();
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn scan(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, CacheError> {
        let mut conn = self.connection().await?;

        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        Ok(ScanPage { cursor, keys })
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection().await?;
        let deleted: u64 = conn.del(keys.to_vec()).await?;
        Ok(deleted)
    }

    async fn info(&self) -> Result<StoreInfo, CacheError> {
        let mut conn = self.connection().await?;
        let info: InfoDict = redis::cmd("INFO").query_async(&mut conn).await?;

        let defaults = StoreInfo::default();
        Ok(StoreInfo {
            memory_used: info
                .get::<String>("used_memory_human")
                .unwrap_or(defaults.memory_used),
            connected_clients: info
                .get::<u64>("connected_clients")
                .unwrap_or(defaults.connected_clients),
            uptime_days: info
                .get::<u64>("uptime_in_days")
                .unwrap_or(defaults.uptime_days),
        })
    }
}
