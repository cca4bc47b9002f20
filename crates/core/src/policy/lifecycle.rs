//! Install / activate lifecycle and the fetch interception entry point.

use std::fmt;
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use super::fallback::OfflineFallback;
use super::router::{RequestClass, Router};
use super::strategy::{Served, Source, Strategies};
use crate::Error;
use crate::cache::CacheStore;
use crate::config::WorkerConfig;
use crate::net::{NetworkFetcher, Request, fetch_with_timeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Installing,
    Waiting,
    Active,
    Superseded,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Installing => "installing",
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Superseded => "superseded",
        };
        f.write_str(s)
    }
}

/// One generation as reported by [`LifecycleManager::status`].
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationStatus {
    pub name: String,
    pub entries: usize,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LifecycleStatus {
    pub state: LifecycleState,
    pub static_generation: String,
    pub dynamic_generation: String,
    pub generations: Vec<GenerationStatus>,
}

/// Owns generation creation and deletion and decides whether a request
/// is intercepted.
pub struct LifecycleManager {
    config: WorkerConfig,
    store: CacheStore,
    fetcher: Arc<dyn NetworkFetcher>,
    router: Router,
    strategies: Strategies,
    state: RwLock<LifecycleState>,
}

impl LifecycleManager {
    pub fn new(config: WorkerConfig, store: CacheStore, fetcher: Arc<dyn NetworkFetcher>) -> Self {
        let fallback = OfflineFallback::new(store.clone(), &config.fallback_document);
        let strategies = Strategies::new(
            store.clone(),
            store.handle(&config.static_generation, None),
            store.handle(&config.dynamic_generation, Some(config.cache_size_limit)),
            Arc::clone(&fetcher),
            config.fetch_timeout,
            fallback,
        );
        let router = Router::new(config.cdn_hosts.clone());

        Self { config, store, fetcher, router, strategies, state: RwLock::new(LifecycleState::Installing) }
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    pub fn classify(&self, request: &Request) -> RequestClass {
        self.router.classify(&request.url, &request.method)
    }

    /// Open both generations and pre-populate them from the manifests.
    ///
    /// Each generation is filled all-or-nothing: if any manifest URL cannot
    /// be fetched with a 2xx status, nothing from that manifest is stored
    /// and the install fails with [`Error::InstallFailure`], leaving the
    /// state unchanged. On success the manager moves to `Waiting`, or on to
    /// `Active` when `skip_waiting` is set.
    pub async fn install(&self) -> Result<LifecycleState, Error> {
        if self.state().await == LifecycleState::Superseded {
            return Err(Error::InvalidState("cannot install a superseded worker".into()));
        }

        tracing::info!(
            static_generation = %self.config.static_generation,
            dynamic_generation = %self.config.dynamic_generation,
            "installing"
        );

        let warmed = tokio::try_join!(
            self.warm(&self.config.static_generation, None, &self.config.static_assets),
            self.warm(
                &self.config.dynamic_generation,
                Some(self.config.cache_size_limit),
                &self.config.offline_pages
            ),
        );
        let (static_count, dynamic_count) = match warmed {
            Ok(counts) => counts,
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                return Err(e);
            }
        };

        {
            let mut state = self.state.write().await;
            if *state == LifecycleState::Installing {
                *state = LifecycleState::Waiting;
            }
        }
        tracing::info!(static_count, dynamic_count, "install complete");

        if self.config.skip_waiting {
            self.activate().await?;
        }

        Ok(self.state().await)
    }

    /// Delete every generation that is not current and start intercepting.
    ///
    /// Idempotent once installed.
    pub async fn activate(&self) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if matches!(*state, LifecycleState::Installing | LifecycleState::Superseded) {
            return Err(Error::InvalidState(format!("cannot activate while {}", *state)));
        }

        for name in self.store.generations().await? {
            if !self.is_current(&name) {
                tracing::info!(generation = %name, "deleting stale generation");
                self.store.delete_generation(&name).await?;
            }
        }

        if *state != LifecycleState::Active {
            *state = LifecycleState::Active;
            tracing::info!("activated, claiming requests");
        }
        Ok(())
    }

    /// Hand over to a newer manager; requests are no longer intercepted.
    pub async fn supersede(&self) {
        *self.state.write().await = LifecycleState::Superseded;
        tracing::info!(static_generation = %self.config.static_generation, "superseded");
    }

    /// Interception entry point.
    ///
    /// Requests that are not intercepted (worker not active, non-GET,
    /// non-http) go straight to the network and may fail. Intercepted
    /// requests always resolve to a response.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Served, Error> {
        if !request.is_get() || !request.is_http() || self.state().await != LifecycleState::Active {
            let response = fetch_with_timeout(self.fetcher.as_ref(), request, self.config.fetch_timeout).await?;
            return Ok(Served { response, source: Source::Passthrough, strategy: None });
        }

        let strategy = self.classify(request).strategy();
        match self.strategies.execute(strategy, request).await {
            Ok(served) => Ok(served),
            Err(e) => {
                if e.is_network() {
                    tracing::debug!(url = %request.url, ?strategy, error = %e, "offline, serving fallback");
                } else {
                    tracing::warn!(url = %request.url, ?strategy, error = %e, "strategy failed, serving offline fallback");
                }
                let response = self.strategies.fallback().respond(request).await;
                Ok(Served { response, source: Source::Fallback, strategy: Some(strategy) })
            }
        }
    }

    pub async fn status(&self) -> Result<LifecycleStatus, Error> {
        let state = self.state().await;
        let mut generations = Vec::new();
        for name in self.store.generations().await? {
            let entries = self.store.handle(&name, None).len().await?;
            let current = self.is_current(&name);
            generations.push(GenerationStatus { name, entries, current });
        }

        Ok(LifecycleStatus {
            state,
            static_generation: self.config.static_generation.clone(),
            dynamic_generation: self.config.dynamic_generation.clone(),
            generations,
        })
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Whether `name` is one of the generations this manager serves from.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.config.static_generation || name == self.config.dynamic_generation
    }

    async fn warm(&self, generation: &str, limit: Option<usize>, urls: &[Url]) -> Result<usize, Error> {
        let cache = match limit {
            Some(limit) => self.store.open_bounded(generation, limit).await?,
            None => self.store.open(generation).await?,
        };

        let fetches = urls.iter().map(|url| {
            let request = Request::get(url.clone());
            async move {
                let response = fetch_with_timeout(self.fetcher.as_ref(), &request, self.config.fetch_timeout)
                    .await
                    .map_err(|e| Error::InstallFailure(format!("{generation}: {url}: {e}")))?;
                if !response.is_ok() {
                    return Err(Error::InstallFailure(format!("{generation}: {url}: status {}", response.status)));
                }
                Ok((request.cache_key(), response))
            }
        });
        let responses = try_join_all(fetches).await?;

        let mut stored = 0;
        for (key, response) in responses {
            if cache
                .put(&key, response)
                .await
                .map_err(|e| Error::InstallFailure(format!("{generation}: {key}: {e}")))?
            {
                stored += 1;
            }
        }
        tracing::debug!(generation, stored, "generation warmed");
        Ok(stored)
    }
}
