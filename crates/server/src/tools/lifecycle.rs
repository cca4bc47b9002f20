//! sw_install, sw_activate and sw_status tools.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use stash_core::LifecycleManager;

use super::json_result;

/// Warm both generations, activating straight away when `skip_waiting` is set.
pub async fn install_impl(manager: &LifecycleManager) -> Result<CallToolResult, McpError> {
    manager.install().await?;
    status_impl(manager).await
}

/// Promote a waiting install and retire stale generations.
pub async fn activate_impl(manager: &LifecycleManager) -> Result<CallToolResult, McpError> {
    manager.activate().await?;
    status_impl(manager).await
}

pub async fn status_impl(manager: &LifecycleManager) -> Result<CallToolResult, McpError> {
    json_result(&manager.status().await?)
}
