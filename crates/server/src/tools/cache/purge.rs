//! cache_purge tool implementation.
//!
//! Trims a generation to its newest entries, or drops it entirely.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stash_core::{Error, LifecycleManager};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Generation to purge.
    pub generation: String,

    /// Keep only the newest N entries. When absent the whole generation is deleted.
    pub keep: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,

    /// Whether the generation itself was removed.
    pub generation_deleted: bool,
}

/// Implementation of the cache_purge tool.
///
/// Deleting a generation the manager currently serves from is refused;
/// those are retired by activation.
pub async fn purge_impl(manager: &LifecycleManager, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.generation.trim().is_empty() {
        return Err(Error::InvalidInput("generation cannot be empty".into()).into());
    }

    let store = manager.store();
    if !store.generations().await?.contains(&params.generation) {
        return json_result(&CachePurgeOutput { deleted: 0, generation_deleted: false });
    }

    let output = match params.keep {
        Some(keep) => {
            let deleted = store.open(&params.generation).await?.evict_oldest(keep).await?;
            CachePurgeOutput { deleted, generation_deleted: false }
        }
        None if manager.is_current(&params.generation) => {
            return Err(Error::InvalidInput(format!(
                "{} is a current generation; pass keep to trim it instead",
                params.generation
            ))
            .into());
        }
        None => {
            let deleted = store.open(&params.generation).await?.len().await? as u64;
            let generation_deleted = store.delete_generation(&params.generation).await?;
            CachePurgeOutput { deleted, generation_deleted }
        }
    };

    tracing::info!(
        generation = %params.generation,
        deleted = output.deleted,
        generation_deleted = output.generation_deleted,
        "cache purged"
    );

    json_result(&output)
}
