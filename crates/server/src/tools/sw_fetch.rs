//! sw_fetch tool implementation.
//!
//! Routes a request through the interception handler exactly as a page
//! load would, and reports where the response came from.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stash_core::{Destination, Error, LifecycleManager, Request, RequestClass, Source, Strategy};

use super::json_result;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// The URL to request.
    pub url: String,

    /// HTTP method (default: GET). Anything but GET bypasses the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination; `document` enables the offline page fallback.
    #[serde(default)]
    pub destination: Option<Destination>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// Canonical request URL.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    /// How the request was classified.
    pub class: RequestClass,
    /// Strategy that produced the response, absent for passthrough.
    pub strategy: Option<Strategy>,
    /// Network, cache, fallback or passthrough.
    pub source: Source,
    /// Response body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(manager: &LifecycleManager, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = Request::parse(&params.method, &params.url)?.with_destination(params.destination.unwrap_or_default());
    let class = manager.classify(&request);
    let served = manager.handle_fetch(&request).await?;

    let output = SwFetchOutput {
        url: request.cache_key(),
        status: served.response.status,
        status_text: served.response.status_text.clone(),
        content_type: served.response.header("content-type").map(str::to_string),
        class,
        strategy: served.strategy,
        source: served.source,
        body: String::from_utf8_lossy(&served.response.body).into_owned(),
        body_bytes: served.response.body.len(),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ORIGIN, TableFetcher, manager, text_of, worker_config};

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.to_string(), method: default_method(), destination: None }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let manager = manager(TableFetcher::with(&[]), worker_config(&[], &[]));
        assert!(fetch_impl(&manager, params("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_static_asset_from_cache() {
        let css = format!("{ORIGIN}/css/style.css");
        let fetcher = TableFetcher::with(&[(css.as_str(), "body{}")]);
        let manager = manager(fetcher.clone(), worker_config(&[css.as_str()], &[]));
        manager.install().await.unwrap();
        fetcher.clear();

        let result = fetch_impl(&manager, params(&css)).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(output.source, Source::Cache);
        assert_eq!(output.class, RequestClass::StaticAsset);
        assert_eq!(output.strategy, Some(Strategy::CacheFirst));
        assert_eq!(output.body, "body{}");
        assert_eq!(output.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_fetch_api_offline_returns_503() {
        let manager = manager(TableFetcher::with(&[]), worker_config(&[], &[]));
        manager.install().await.unwrap();

        let result = fetch_impl(&manager, params(&format!("{ORIGIN}/api/messages"))).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(output.status, 503);
        assert_eq!(output.source, Source::Fallback);
        assert_eq!(output.class, RequestClass::ApiOrDynamic);
    }

    #[tokio::test]
    async fn test_fetch_document_offline_gets_offline_page() {
        let manager = manager(TableFetcher::with(&[]), worker_config(&[], &[]));
        manager.install().await.unwrap();

        let request = SwFetchParams { destination: Some(Destination::Document), ..params(&format!("{ORIGIN}/about")) };
        let result = fetch_impl(&manager, request).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(output.status, 200);
        assert!(output.body.contains("You're Offline"));
    }

    #[tokio::test]
    async fn test_fetch_passthrough_failure_is_error() {
        let manager = manager(TableFetcher::with(&[]), worker_config(&[], &[]));
        let result = fetch_impl(&manager, params(&format!("{ORIGIN}/api/messages"))).await;
        assert!(result.is_err());
    }
}
