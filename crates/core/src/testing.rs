//! Test doubles shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::Error;
use crate::cache::{CacheBackend, CacheEntry, MemoryBackend};
use crate::net::{NetworkFetcher, Request, Response};

/// A fetcher that answers from a fixed table and counts calls.
///
/// Unscripted URLs fail with [`Error::NetworkFailure`], as does every URL
/// while the fetcher is offline.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<String>>,
    total: AtomicUsize,
    offline: AtomicBool,
    delay: Option<Duration>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl NetworkFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let key = request.cache_key();
        self.total.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(key.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::NetworkFailure(format!("offline: {key}")));
        }

        self.responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NetworkFailure(format!("unreachable: {key}")))
    }
}

/// Memory backend whose writes take `delay` to land.
pub struct SlowPutBackend {
    inner: MemoryBackend,
    delay: Duration,
}

impl SlowPutBackend {
    pub fn new(delay: Duration) -> Self {
        Self { inner: MemoryBackend::new(), delay }
    }
}

#[async_trait]
impl CacheBackend for SlowPutBackend {
    async fn create_generation(&self, generation: &str) -> Result<(), Error> {
        self.inner.create_generation(generation).await
    }

    async fn generations(&self) -> Result<Vec<String>, Error> {
        self.inner.generations().await
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        self.inner.delete_generation(generation).await
    }

    async fn get(&self, generation: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        self.inner.get(generation, key).await
    }

    async fn put(&self, generation: &str, entry: CacheEntry) -> Result<(), Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(generation, entry).await
    }

    async fn delete(&self, generation: &str, key: &str) -> Result<bool, Error> {
        self.inner.delete(generation, key).await
    }

    async fn keys(&self, generation: &str) -> Result<Vec<String>, Error> {
        self.inner.keys(generation).await
    }

    async fn evict_oldest(&self, generation: &str, keep: usize) -> Result<u64, Error> {
        self.inner.evict_oldest(generation, keep).await
    }
}
