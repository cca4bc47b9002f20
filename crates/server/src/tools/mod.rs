//! MCP tool implementations.
//!
//! This module contains all tools exposed by the stash server.

pub mod cache;
pub mod lifecycle;
pub mod messages;
pub mod sw_fetch;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use stash_core::Error;

pub use sw_fetch::SwFetchParams;

/// Serialize `output` as the single text content of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use stash_core::{CacheStore, Error, LifecycleManager, NetworkFetcher, Request, Response, WorkerConfig};
    use url::Url;

    pub const ORIGIN: &str = "http://localhost:3000";

    /// Fetcher answering from a table; unknown URLs are unreachable.
    #[derive(Default)]
    pub struct TableFetcher {
        pub responses: Mutex<HashMap<String, Response>>,
    }

    impl TableFetcher {
        pub fn with(entries: &[(&str, &str)]) -> Arc<Self> {
            let fetcher = Self::default();
            {
                let mut responses = fetcher.responses.lock().unwrap();
                for (url, body) in entries {
                    responses.insert(url.to_string(), Response::ok(*body).with_header("Content-Type", "text/plain"));
                }
            }
            Arc::new(fetcher)
        }

        pub fn clear(&self) {
            self.responses.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl NetworkFetcher for TableFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.responses
                .lock()
                .unwrap()
                .get(&request.cache_key())
                .cloned()
                .ok_or_else(|| Error::NetworkFailure(format!("unreachable: {}", request.url)))
        }
    }

    pub fn worker_config(static_assets: &[&str], offline_pages: &[&str]) -> WorkerConfig {
        let parse = |urls: &[&str]| -> Vec<Url> { urls.iter().map(|u| Url::parse(u).unwrap()).collect() };
        WorkerConfig {
            static_generation: "portfolio-static-v1".into(),
            dynamic_generation: "portfolio-dynamic-v1".into(),
            static_assets: parse(static_assets),
            offline_pages: parse(offline_pages),
            fallback_document: Url::parse(&format!("{ORIGIN}/modern-portfolio.html")).unwrap(),
            cdn_hosts: vec!["cdn.jsdelivr.net".into()],
            cache_size_limit: 50,
            fetch_timeout: Duration::from_secs(1),
            skip_waiting: true,
        }
    }

    pub fn manager(fetcher: Arc<TableFetcher>, config: WorkerConfig) -> LifecycleManager {
        LifecycleManager::new(config, CacheStore::in_memory(), fetcher)
    }

    /// Text payload of the first content item.
    pub fn text_of(result: &CallToolResult) -> String {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content")
            .to_string()
    }
}
