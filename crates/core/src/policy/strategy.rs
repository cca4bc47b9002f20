//! The four fetch strategies.
//!
//! Cache writes run on spawned tasks that the request then awaits, so a
//! caller that drops its future does not cancel a write already in flight.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::fallback::OfflineFallback;
use crate::Error;
use crate::cache::{CacheEntry, CacheHandle, CacheStore};
use crate::net::{NetworkFetcher, Request, Response, fetch_with_timeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
    NetworkFirstWithFallback,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Network,
    Cache,
    Fallback,
    /// Not intercepted; fetched directly.
    Passthrough,
}

#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
    pub strategy: Option<Strategy>,
}

impl Served {
    fn new(response: Response, source: Source, strategy: Strategy) -> Self {
        Self { response, source, strategy: Some(strategy) }
    }
}

/// Shared state for strategy execution.
///
/// Reads and writes entries but never creates or deletes generations;
/// that belongs to the lifecycle manager.
#[derive(Clone)]
pub struct Strategies {
    store: CacheStore,
    static_cache: CacheHandle,
    dynamic_cache: CacheHandle,
    fetcher: Arc<dyn NetworkFetcher>,
    timeout: Duration,
    fallback: OfflineFallback,
}

impl Strategies {
    pub fn new(
        store: CacheStore, static_cache: CacheHandle, dynamic_cache: CacheHandle, fetcher: Arc<dyn NetworkFetcher>,
        timeout: Duration, fallback: OfflineFallback,
    ) -> Self {
        Self { store, static_cache, dynamic_cache, fetcher, timeout, fallback }
    }

    pub fn fallback(&self) -> &OfflineFallback {
        &self.fallback
    }

    pub async fn execute(&self, strategy: Strategy, request: &Request) -> Result<Served, Error> {
        tracing::debug!(url = %request.url, ?strategy, "executing strategy");
        match strategy {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
            Strategy::NetworkFirstWithFallback => Ok(self.network_first_with_fallback(request).await),
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<Served, Error> {
        let key = request.cache_key();
        if let Some(entry) = self.lookup_any(&key).await {
            tracing::debug!(key, "cache hit");
            return Ok(Served::new(entry.response, Source::Cache, Strategy::CacheFirst));
        }

        let response = self.fetch(request).await?;
        write_through(&self.static_cache, key, response.clone()).await;
        Ok(Served::new(response, Source::Network, Strategy::CacheFirst))
    }

    async fn network_first(&self, request: &Request) -> Result<Served, Error> {
        let key = request.cache_key();
        match self.fetch(request).await {
            Ok(response) => {
                write_through(&self.dynamic_cache, key, response.clone()).await;
                Ok(Served::new(response, Source::Network, Strategy::NetworkFirst))
            }
            Err(e) => match self.lookup_any(&key).await {
                Some(entry) => {
                    tracing::debug!(key, error = %e, "network failed, serving cached copy");
                    Ok(Served::new(entry.response, Source::Cache, Strategy::NetworkFirst))
                }
                None => Err(e),
            },
        }
    }

    async fn stale_while_revalidate(&self, request: &Request) -> Result<Served, Error> {
        let key = request.cache_key();
        let cached = match self.dynamic_cache.match_key(&key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache lookup failed");
                None
            }
        };

        let refresh = {
            let fetcher = Arc::clone(&self.fetcher);
            let cache = self.dynamic_cache.clone();
            let request = request.clone();
            let timeout = self.timeout;
            let key = key.clone();
            tokio::spawn(async move {
                let result = fetch_with_timeout(fetcher.as_ref(), &request, timeout).await;
                match &result {
                    Ok(response) => {
                        if let Err(e) = cache.put(&key, response.clone()).await {
                            tracing::warn!(key, error = %e, "revalidation write failed");
                        }
                    }
                    Err(e) => tracing::warn!(key, error = %e, "revalidation fetch failed"),
                }
                result
            })
        };

        if let Some(entry) = cached {
            tracing::debug!(key, "serving stale entry, revalidating in background");
            return Ok(Served::new(entry.response, Source::Cache, Strategy::StaleWhileRevalidate));
        }

        match refresh.await {
            Ok(result) => Ok(Served::new(result?, Source::Network, Strategy::StaleWhileRevalidate)),
            Err(e) => Err(Error::NetworkFailure(format!("revalidation task failed: {e}"))),
        }
    }

    async fn network_first_with_fallback(&self, request: &Request) -> Served {
        match self.network_first(request).await {
            Ok(served) => Served { strategy: Some(Strategy::NetworkFirstWithFallback), ..served },
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "no network and no cache, serving offline fallback");
                Served::new(self.fallback.respond(request).await, Source::Fallback, Strategy::NetworkFirstWithFallback)
            }
        }
    }

    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        fetch_with_timeout(self.fetcher.as_ref(), request, self.timeout).await
    }

    /// Store-wide lookup; a backend error counts as a miss.
    async fn lookup_any(&self, key: &str) -> Option<CacheEntry> {
        match self.store.match_any(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache lookup failed");
                None
            }
        }
    }
}

async fn write_through(cache: &CacheHandle, key: String, response: Response) {
    let handle = cache.clone();
    let write = tokio::spawn(async move { handle.put(&key, response).await });
    match write.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::warn!(generation = cache.name(), error = %e, "cache write failed"),
        Err(e) => tracing::warn!(generation = cache.name(), error = %e, "cache write task did not complete"),
    }
}
