//! Responses of last resort.

use url::Url;

use super::router::is_page_request;
use crate::cache::CacheStore;
use crate::canonical::cache_key;
use crate::net::{Destination, Request, Response};

/// Page returned when no cached document is available.
pub const OFFLINE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Offline</title>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            text-align: center;
            padding: 50px 20px;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            margin: 0;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            flex-direction: column;
        }
        h1 { font-size: 2rem; margin-bottom: 1rem; }
        p { font-size: 1.1rem; opacity: 0.9; max-width: 400px; }
        .retry-btn {
            background: rgba(255,255,255,0.2);
            border: 2px solid rgba(255,255,255,0.3);
            color: white;
            padding: 12px 24px;
            border-radius: 25px;
            cursor: pointer;
            font-size: 1rem;
            margin-top: 2rem;
        }
    </style>
</head>
<body>
    <div class="offline-content">
        <h1>You're Offline</h1>
        <p>This site works offline, but this page isn't cached yet. Check your connection and try again.</p>
        <button class="retry-btn" onclick="window.location.reload()">Retry Connection</button>
    </div>
    <script>
        window.addEventListener('online', () => window.location.reload());
    </script>
</body>
</html>
"#;

/// Produces a response when neither network nor cache could.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    store: CacheStore,
    document_key: String,
}

impl OfflineFallback {
    pub fn new(store: CacheStore, document: &Url) -> Self {
        Self { store, document_key: cache_key(document) }
    }

    /// Never fails. Documents get the cached fallback page or the static
    /// offline page; everything else gets a bare 503.
    pub async fn respond(&self, request: &Request) -> Response {
        if request.destination == Destination::Document || is_page_request(&request.url) {
            match self.store.match_any(&self.document_key).await {
                Ok(Some(entry)) => return entry.response,
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %self.document_key, error = %e, "fallback document lookup failed"),
            }
            return offline_page();
        }

        service_unavailable()
    }
}

pub fn offline_page() -> Response {
    Response::ok(OFFLINE_HTML).with_header("Content-Type", "text/html")
}

pub fn service_unavailable() -> Response {
    Response::ok("Offline").with_status(503, "Service Unavailable")
}
