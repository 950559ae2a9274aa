/// Attempt-counter storage
///
/// The recovery verifier treats the attempt counter as a mutable integer
/// cell keyed by an opaque session identifier. Production uses Redis (the
/// counter expires with the session); tests use the in-memory store.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key prefix for recovery attempt counters
const KEY_PREFIX: &str = "recovery:attempts:";

/// Attempt-store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection error
    #[error("Attempt store connection error: {0}")]
    Connection(String),

    /// Command execution error
    #[error("Attempt store command error: {0}")]
    Command(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => StoreError::Connection(format!("IO error: {}", err)),
            _ => StoreError::Command(err.to_string()),
        }
    }
}

/// Session-scoped integer cell for recovery attempts
///
/// One key per browsing session; `clear` is the flush-on-success path.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Reads the stored counter, None for a fresh session
    async fn get(&self, session_key: &str) -> Result<Option<u32>, StoreError>;

    /// Writes the counter
    async fn put(&self, session_key: &str, remaining: u32) -> Result<(), StoreError>;

    /// Removes the counter (flush-on-success)
    async fn clear(&self, session_key: &str) -> Result<(), StoreError>;
}

/// Redis-backed attempt store
///
/// Counters live under `recovery:attempts:{session}` with a TTL so
/// abandoned sessions clean themselves up.
#[derive(Clone)]
pub struct RedisAttemptStore {
    conn: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisAttemptStore {
    /// Default counter lifetime: one day, comfortably longer than any
    /// recovery session
    pub const DEFAULT_TTL_SECONDS: u64 = 86_400;

    /// Connects to Redis
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the URL is invalid or the
    /// server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Connection(format!("Failed to create Redis client: {}", e)))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            conn,
            ttl_seconds: Self::DEFAULT_TTL_SECONDS,
        })
    }

    /// Overrides the counter TTL
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    fn key(session_key: &str) -> String {
        format!("{}{}", KEY_PREFIX, session_key)
    }
}

#[async_trait]
impl AttemptStore for RedisAttemptStore {
    async fn get(&self, session_key: &str) -> Result<Option<u32>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<u32> = conn.get(Self::key(session_key)).await?;
        Ok(value)
    }

    async fn put(&self, session_key: &str, remaining: u32) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::key(session_key), remaining, self.ttl_seconds)
            .await?;
        Ok(())
    }

    async fn clear(&self, session_key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(Self::key(session_key)).await?;
        Ok(())
    }
}

/// In-memory attempt store for tests and single-process deployments
#[derive(Debug, Clone, Default)]
pub struct MemoryAttemptStore {
    counters: Arc<Mutex<HashMap<String, u32>>>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn get(&self, session_key: &str) -> Result<Option<u32>, StoreError> {
        let counters = self
            .counters
            .lock()
            .map_err(|e| StoreError::Command(format!("Lock poisoned: {}", e)))?;
        Ok(counters.get(session_key).copied())
    }

    async fn put(&self, session_key: &str, remaining: u32) -> Result<(), StoreError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| StoreError::Command(format!("Lock poisoned: {}", e)))?;
        counters.insert(session_key.to_string(), remaining);
        Ok(())
    }

    async fn clear(&self, session_key: &str) -> Result<(), StoreError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| StoreError::Command(format!("Lock poisoned: {}", e)))?;
        counters.remove(session_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryAttemptStore::new();

        assert_eq!(store.get("s1").await.unwrap(), None);

        store.put("s1", 4).await.unwrap();
        assert_eq!(store.get("s1").await.unwrap(), Some(4));

        store.put("s1", 3).await.unwrap();
        assert_eq!(store.get("s1").await.unwrap(), Some(3));

        store.clear("s1").await.unwrap();
        assert_eq!(store.get("s1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_sessions_are_independent() {
        let store = MemoryAttemptStore::new();

        store.put("s1", 1).await.unwrap();
        store.put("s2", 5).await.unwrap();

        assert_eq!(store.get("s1").await.unwrap(), Some(1));
        assert_eq!(store.get("s2").await.unwrap(), Some(5));
    }

    #[test]
    fn test_redis_key_prefix() {
        assert_eq!(
            RedisAttemptStore::key("abc123"),
            "recovery:attempts:abc123"
        );
    }
}
