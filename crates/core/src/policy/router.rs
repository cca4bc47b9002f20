//! Request classification by URL shape.

use serde::{Deserialize, Serialize};
use url::Url;

use super::Strategy;

/// Path suffixes served cache-first.
const STATIC_EXTENSIONS: &[&str] = &["css", "js", "png", "jpg", "jpeg", "gif", "svg", "woff", "woff2", "ttf", "eot"];

/// Coarse request kinds; each maps to exactly one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    StaticAsset,
    ApiOrDynamic,
    PageDocument,
    Other,
}

impl RequestClass {
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::ApiOrDynamic => Strategy::NetworkFirst,
            Self::StaticAsset => Strategy::CacheFirst,
            Self::PageDocument => Strategy::StaleWhileRevalidate,
            Self::Other => Strategy::NetworkFirstWithFallback,
        }
    }
}

/// Classifies requests; holds only the CDN host allow-list.
#[derive(Debug, Clone, Default)]
pub struct Router {
    cdn_hosts: Vec<String>,
}

impl Router {
    pub fn new(cdn_hosts: Vec<String>) -> Self {
        Self { cdn_hosts }
    }

    /// First matching rule wins:
    /// non-GET, API/no-cache marker, static suffix or CDN host, page shape.
    pub fn classify(&self, url: &Url, method: &str) -> RequestClass {
        if !method.eq_ignore_ascii_case("GET") {
            return RequestClass::Other;
        }

        if url.path().contains("/api/") || url.query().is_some_and(|q| q.contains("cache=no")) {
            return RequestClass::ApiOrDynamic;
        }

        if has_static_extension(url.path()) || self.is_cdn_host(url) {
            return RequestClass::StaticAsset;
        }

        if is_page_request(url) {
            return RequestClass::PageDocument;
        }

        RequestClass::Other
    }

    fn is_cdn_host(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| self.cdn_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)))
    }
}

/// Whether the URL looks like an HTML page of the site.
pub fn is_page_request(url: &Url) -> bool {
    let path = url.path();
    path.ends_with(".html") || path == "/" || path.contains("/pages/")
}

fn has_static_extension(path: &str) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    // a dot in a directory name is not an extension
    !ext.contains('/') && STATIC_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext))
}
