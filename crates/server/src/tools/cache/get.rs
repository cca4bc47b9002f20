//! cache_get tool implementation.
//!
//! Retrieves one stored response from a named generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stash_core::{CacheStore, Error, Request};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Generation name, e.g. `portfolio-static-v2.0`.
    pub generation: String,

    /// Request URL the response was stored under.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub generation: String,
    pub key: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(store: &CacheStore, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let key = Request::parse("GET", &params.url)?.cache_key();

    if !store.generations().await?.contains(&params.generation) {
        return Err(Error::CacheMiss(format!("no generation named {}", params.generation)).into());
    }

    let entry = store
        .open(&params.generation)
        .await?
        .match_key(&key)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{key} in {}", params.generation)))?;

    let output = CacheGetOutput {
        generation: params.generation,
        key: entry.key,
        status: entry.response.status,
        status_text: entry.response.status_text,
        headers: entry.response.headers,
        body: String::from_utf8_lossy(&entry.response.body).into_owned(),
        stored_at: entry.stored_at.to_rfc3339(),
    };

    json_result(&output)
}
