//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STASH_*)
//! 2. TOML config file (if STASH_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Manifests are easiest to maintain in the TOML file:
//!
//! ```toml
//! origin = "https://portfolio.example"
//! cache_version = "v3.0"
//! static_assets = ["/css/style.css", "/js/main.js"]
//! offline_pages = ["/pages/html.html"]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::canonical::resolve;

mod validation;

pub use validation::ConfigError;

/// Which [`CacheBackend`](crate::cache::CacheBackend) the host should open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Memory,
}

/// What a generation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Static,
    Dynamic,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

/// A named, versioned cache partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheGeneration {
    pub prefix: String,
    pub purpose: Purpose,
    pub version: String,
}

impl CacheGeneration {
    /// `{prefix}-{purpose}-{version}`, e.g. `portfolio-static-v2.0`.
    pub fn name(&self) -> String {
        format!("{}-{}-{}", self.prefix, self.purpose.as_str(), self.version)
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STASH_*)
/// 2. TOML config file (if STASH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site origin that relative manifest entries resolve against.
    ///
    /// Set via STASH_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Cache backend to open.
    ///
    /// Set via STASH_BACKEND environment variable (`sqlite` or `memory`).
    #[serde(default)]
    pub backend: BackendKind,

    /// Path to SQLite cache database (sqlite backend only).
    ///
    /// Set via STASH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Leading part of every generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version suffix of every generation name. Bumping it retires the
    /// previous generations on the next activation.
    ///
    /// Set via STASH_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Entry cap for the dynamic generation.
    ///
    /// Set via STASH_CACHE_SIZE_LIMIT environment variable.
    #[serde(default = "default_cache_size_limit")]
    pub cache_size_limit: usize,

    /// Assets pre-cached into the static generation on install.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Pages pre-cached into the dynamic generation on install.
    #[serde(default = "default_offline_pages")]
    pub offline_pages: Vec<String>,

    /// Document served when a page request cannot be satisfied.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// Hosts whose responses are always treated as static assets.
    #[serde(default = "default_cdn_hosts")]
    pub cdn_hosts: Vec<String>,

    /// Network fetch timeout in milliseconds.
    ///
    /// Set via STASH_FETCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Maximum response body size in bytes.
    ///
    /// Set via STASH_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via STASH_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Activate immediately after a successful install.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Run install when the server starts.
    #[serde(default = "default_true")]
    pub install_on_start: bool,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stash-cache.sqlite")
}

fn default_cache_prefix() -> String {
    "portfolio".into()
}

fn default_cache_version() -> String {
    "v2.0".into()
}

fn default_cache_size_limit() -> usize {
    50
}

fn default_static_assets() -> Vec<String> {
    [
        "/modern-portfolio.html",
        "/css/style.css",
        "/css/hero-enhancements.css",
        "/css/typing-effect.css",
        "/css/themes/variables.css",
        "/js/main.js",
        "/js/typing-effect.js",
        "/assets/images/Picture1.png",
        "/assets/resume.pdf",
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/css/bootstrap.min.css",
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/js/bootstrap.bundle.min.js",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css",
        "https://fonts.googleapis.com/css2?family=Manrope:wght@400;600;700&family=Inter:wght@400;500;600&display=swap",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_pages() -> Vec<String> {
    ["/pages/html.html", "/pages/css.html", "/pages/javascript.html", "/pages/bootstrap.html", "/pages/fullstack.html"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_fallback_document() -> String {
    "/modern-portfolio.html".into()
}

fn default_cdn_hosts() -> Vec<String> {
    ["cdn.jsdelivr.net", "cdnjs.cloudflare.com", "fonts.googleapis.com", "fonts.gstatic.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_user_agent() -> String {
    "stash/0.1".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            backend: BackendKind::default(),
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            cache_size_limit: default_cache_size_limit(),
            static_assets: default_static_assets(),
            offline_pages: default_offline_pages(),
            fallback_document: default_fallback_document(),
            cdn_hosts: default_cdn_hosts(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            max_bytes: default_max_bytes(),
            user_agent: default_user_agent(),
            skip_waiting: true,
            install_on_start: true,
        }
    }
}

/// Resolved settings consumed by the lifecycle manager.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub static_generation: String,
    pub dynamic_generation: String,
    pub static_assets: Vec<Url>,
    pub offline_pages: Vec<Url>,
    pub fallback_document: Url,
    pub cdn_hosts: Vec<String>,
    pub cache_size_limit: usize,
    pub fetch_timeout: Duration,
    pub skip_waiting: bool,
}

impl AppConfig {
    /// Fetch timeout as Duration for use with reqwest/tokio.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn generation(&self, purpose: Purpose) -> CacheGeneration {
        CacheGeneration { prefix: self.cache_prefix.clone(), purpose, version: self.cache_version.clone() }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STASH_`
    /// 2. TOML file from `STASH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STASH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STASH_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Resolve manifests against the origin and derive generation names.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin or any manifest entry
    /// is not a usable http(s) URL.
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        let origin = self.origin_url()?;
        let resolve_all = |field: &str, entries: &[String]| -> Result<Vec<Url>, ConfigError> {
            entries
                .iter()
                .map(|entry| {
                    resolve(&origin, entry)
                        .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{entry}: {e}") })
                })
                .collect()
        };

        Ok(WorkerConfig {
            static_generation: self.generation(Purpose::Static).name(),
            dynamic_generation: self.generation(Purpose::Dynamic).name(),
            static_assets: resolve_all("static_assets", &self.static_assets)?,
            offline_pages: resolve_all("offline_pages", &self.offline_pages)?,
            fallback_document: resolve(&origin, &self.fallback_document).map_err(|e| ConfigError::Invalid {
                field: "fallback_document".into(),
                reason: e.to_string(),
            })?,
            cdn_hosts: self.cdn_hosts.iter().map(|h| h.to_lowercase()).collect(),
            cache_size_limit: self.cache_size_limit,
            fetch_timeout: self.fetch_timeout(),
            skip_waiting: self.skip_waiting,
        })
    }

    pub(crate) fn origin_url(&self) -> Result<Url, ConfigError> {
        let origin = Url::parse(self.origin.trim())
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL".into() });
        }
        Ok(origin)
    }
}
