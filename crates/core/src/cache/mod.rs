//! Generation-partitioned response cache.
//!
//! A [`CacheStore`] is a set of named generations, each an insertion-ordered
//! list of [`CacheEntry`] values keyed by canonical request URL. Storage is
//! delegated to a [`CacheBackend`]:
//!
//! - [`MemoryBackend`] keeps everything in-process
//! - [`CacheDb`] persists to SQLite with WAL mode and versioned migrations
//!
//! Eviction is FIFO: the oldest inserted entries go first, and overwriting
//! a key moves it to the tail.

pub mod connection;
pub mod entries;
pub mod memory;
pub mod migrations;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::Error;
use crate::net::Response;

pub use connection::CacheDb;
pub use memory::MemoryBackend;

/// A stored response together with its key and insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub response: Response,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, response: Response) -> Self {
        Self { key: key.into(), response, stored_at: Utc::now() }
    }
}

/// Key-value blob storage partitioned by generation name.
///
/// Every method is a single atomic operation. `put` creates the generation
/// when it does not exist and replaces any entry with the same key,
/// appending the new entry at the tail.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Create the generation if absent.
    async fn create_generation(&self, generation: &str) -> Result<(), Error>;

    /// Generation names in creation order.
    async fn generations(&self) -> Result<Vec<String>, Error>;

    async fn delete_generation(&self, generation: &str) -> Result<bool, Error>;

    async fn get(&self, generation: &str, key: &str) -> Result<Option<CacheEntry>, Error>;

    async fn put(&self, generation: &str, entry: CacheEntry) -> Result<(), Error>;

    async fn delete(&self, generation: &str, key: &str) -> Result<bool, Error>;

    /// Keys in insertion order, oldest first.
    async fn keys(&self, generation: &str) -> Result<Vec<String>, Error>;

    /// Delete the oldest entries until at most `keep` remain.
    ///
    /// Returns the number of deleted entries.
    async fn evict_oldest(&self, generation: &str, keep: usize) -> Result<u64, Error> {
        let keys = self.keys(generation).await?;
        let excess = keys.len().saturating_sub(keep);
        let mut deleted = 0;
        for key in keys.iter().take(excess) {
            if self.delete(generation, key).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Shared entry point to the cache, cheap to clone.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}

impl CacheStore {
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// An in-process store, mostly for tests and ephemeral hosts.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Open (creating if needed) an unbounded generation.
    pub async fn open(&self, generation: &str) -> Result<CacheHandle, Error> {
        self.backend.create_generation(generation).await?;
        Ok(self.handle(generation, None))
    }

    /// Open (creating if needed) a generation capped at `limit` entries.
    pub async fn open_bounded(&self, generation: &str, limit: usize) -> Result<CacheHandle, Error> {
        self.backend.create_generation(generation).await?;
        Ok(self.handle(generation, Some(limit)))
    }

    /// Handle to a generation without creating it. Writes create it lazily.
    pub(crate) fn handle(&self, generation: &str, limit: Option<usize>) -> CacheHandle {
        CacheHandle { name: generation.to_string(), limit, backend: Arc::clone(&self.backend) }
    }

    /// Look `key` up in every generation, oldest generation first.
    pub async fn match_any(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        for generation in self.backend.generations().await? {
            if let Some(entry) = self.backend.get(&generation, key).await? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    pub async fn generations(&self) -> Result<Vec<String>, Error> {
        self.backend.generations().await
    }

    pub async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        self.backend.delete_generation(generation).await
    }
}

/// A view onto a single generation.
#[derive(Clone)]
pub struct CacheHandle {
    name: String,
    limit: Option<usize>,
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle").field("name", &self.name).field("limit", &self.limit).finish()
    }
}

impl CacheHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub async fn match_key(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        self.backend.get(&self.name, key).await
    }

    /// Store `response` under `key`.
    ///
    /// Returns `false` without touching the cache when the response is not
    /// a `200`. Bounded handles evict down to their limit after the write.
    pub async fn put(&self, key: &str, response: Response) -> Result<bool, Error> {
        if !response.is_cacheable() {
            tracing::debug!(generation = %self.name, key, status = response.status, "skipping uncacheable response");
            return Ok(false);
        }

        self.backend.put(&self.name, CacheEntry::new(key, response)).await?;

        if let Some(limit) = self.limit {
            let evicted = self.backend.evict_oldest(&self.name, limit).await?;
            if evicted > 0 {
                tracing::debug!(generation = %self.name, evicted, limit, "evicted oldest entries");
            }
        }

        Ok(true)
    }

    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        self.backend.delete(&self.name, key).await
    }

    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.backend.keys(&self.name).await
    }

    pub async fn len(&self) -> Result<usize, Error> {
        Ok(self.keys().await?.len())
    }

    /// Delete `max(0, len - keep)` oldest entries.
    pub async fn evict_oldest(&self, keep: usize) -> Result<u64, Error> {
        self.backend.evict_oldest(&self.name, keep).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(i: usize) -> String {
        format!("https://example.com/item/{i}")
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let store = CacheStore::in_memory();
        store.open("static-v1").await.unwrap();
        store.open("static-v1").await.unwrap();
        assert_eq!(store.generations().await.unwrap(), vec!["static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_skips_failed_responses() {
        let store = CacheStore::in_memory();
        let cache = store.open("dynamic-v1").await.unwrap();

        let stored = cache.put(&key(1), Response::ok("").with_status(500, "Internal Server Error")).await.unwrap();
        assert!(!stored);
        assert!(cache.match_key(&key(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_key() {
        let store = CacheStore::in_memory();
        let cache = store.open("dynamic-v1").await.unwrap();

        cache.put(&key(1), Response::ok("old")).await.unwrap();
        cache.put(&key(2), Response::ok("other")).await.unwrap();
        cache.put(&key(1), Response::ok("new")).await.unwrap();

        let entry = cache.match_key(&key(1)).await.unwrap().unwrap();
        assert_eq!(entry.response.body, b"new");
        assert_eq!(cache.keys().await.unwrap(), vec![key(2), key(1)]);
    }

    #[tokio::test]
    async fn test_bounded_generation_keeps_most_recent() {
        let store = CacheStore::in_memory();
        let cache = store.open_bounded("dynamic-v1", 50).await.unwrap();

        for i in 0..60 {
            cache.put(&key(i), Response::ok(format!("body {i}"))).await.unwrap();
            assert!(cache.len().await.unwrap() <= 50);
        }

        let keys = cache.keys().await.unwrap();
        let expected: Vec<String> = (10..60).map(key).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_evict_oldest() {
        let store = CacheStore::in_memory();
        let cache = store.open("static-v1").await.unwrap();
        for i in 0..5 {
            cache.put(&key(i), Response::ok("x")).await.unwrap();
        }

        assert_eq!(cache.evict_oldest(2).await.unwrap(), 3);
        assert_eq!(cache.keys().await.unwrap(), vec![key(3), key(4)]);
        assert_eq!(cache.evict_oldest(10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_match_any_scans_generations_in_creation_order() {
        let store = CacheStore::in_memory();
        let first = store.open("static-v1").await.unwrap();
        let second = store.open("dynamic-v1").await.unwrap();

        second.put(&key(1), Response::ok("dynamic")).await.unwrap();
        assert_eq!(store.match_any(&key(1)).await.unwrap().unwrap().response.body, b"dynamic");

        first.put(&key(1), Response::ok("static")).await.unwrap();
        assert_eq!(store.match_any(&key(1)).await.unwrap().unwrap().response.body, b"static");

        assert!(store.match_any(&key(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let store = CacheStore::in_memory();
        let cache = store.open("static-v1").await.unwrap();
        cache.put(&key(1), Response::ok("x")).await.unwrap();

        assert!(store.delete_generation("static-v1").await.unwrap());
        assert!(!store.delete_generation("static-v1").await.unwrap());
        assert!(store.generations().await.unwrap().is_empty());
        assert!(store.match_any(&key(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let store = CacheStore::in_memory();
        let cache = store.open("static-v1").await.unwrap();
        cache.put(&key(1), Response::ok("x")).await.unwrap();

        assert!(cache.delete(&key(1)).await.unwrap());
        assert!(!cache.delete(&key(1)).await.unwrap());
    }
}
