//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    SwFetchParams,
    cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl},
    lifecycle::{activate_impl, install_impl, status_impl},
    messages::{list_impl, post_impl},
    sw_fetch::fetch_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use stash_core::{LifecycleManager, MessageRepository, NewMessage};

/// The main MCP server handler for stash.
#[derive(Clone)]
pub struct StashServer {
    tool_router: ToolRouter<Self>,
    manager: Arc<LifecycleManager>,
    messages: Arc<dyn MessageRepository>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl StashServer {
    /// Create a new server handler.
    pub fn new(manager: Arc<LifecycleManager>, messages: Arc<dyn MessageRepository>) -> Self {
        Self { tool_router: Self::tool_router(), manager, messages }
    }

    /// Fetch a URL through the offline-first cache.
    ///
    /// GET requests are routed to a caching strategy once the worker is active;
    /// everything else goes straight to the network.
    #[tool(
        description = "Fetch a URL through the offline-first cache. Returns status, body and whether the response came from network, cache or the offline fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.manager, params.0).await
    }

    #[tool(description = "Pre-cache the static and offline manifests. All-or-nothing; activates immediately when skip_waiting is set.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.manager).await
    }

    #[tool(description = "Activate an installed worker and delete every generation that is not current.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.manager).await
    }

    #[tool(description = "Report the lifecycle state and the entry count of each cache generation.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.manager).await
    }

    #[tool(description = "Retrieve a stored response by generation name and request URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.manager.store(), params.0).await
    }

    #[tool(description = "Trim a generation to its newest `keep` entries, or delete a stale generation when `keep` is omitted.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.manager, params.0).await
    }

    #[tool(description = "List contact messages in the order they were received.")]
    async fn messages_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(self.messages.as_ref()).await
    }

    #[tool(description = "Store a contact message. name, email and message are required.")]
    async fn messages_post(&self, params: Parameters<NewMessage>) -> Result<CallToolResult, McpError> {
        post_impl(self.messages.as_ref(), params.0).await
    }
}

impl ServerHandler for StashServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "stash".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline-first request cache. Call sw_install once, then route requests through sw_fetch.".into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
