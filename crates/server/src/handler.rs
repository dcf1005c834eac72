//! MCP server handler implementation.
//!
//! The server plays the browser around one worker version: it owns the page
//! registry and notification tray, and routes tool calls to worker events.
use std::sync::Arc;

use crate::tools::{
    cache::list_impl,
    clients::{ClientsOpenParams, open_impl},
    events::{
        SwMessageParams, SwNotificationClickParams, SwPushParams, SwSyncParams, message_impl,
        notification_click_impl, push_impl, sync_impl,
    },
    fetch::{SwFetchParams, fetch_impl},
    lifecycle::{activate_impl, install_impl},
};

use aquanev_worker::{PageHost, ServiceWorker};
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

/// The MCP server handler for aquanev-sw.
#[derive(Clone)]
pub struct AquanevServer {
    worker: Arc<ServiceWorker>,
    host: Arc<PageHost>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl AquanevServer {
    /// Create a new server handler around a worker and its host.
    pub fn new(worker: Arc<ServiceWorker>, host: Arc<PageHost>) -> Self {
        Self { worker, host, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Intercept a request through the offline worker. Returns the routing class, the response source (network, cache, offline-fallback) and the response."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Run the install event: pre-cache the application shell. Failed assets are reported, not fatal. The worker then waits for activation."
    )]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker, &self.host).await
    }

    #[tool(description = "Run the activate event: delete cache partitions of other versions and claim open clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker, &self.host).await
    }

    #[tool(description = "Post a page message to the worker (SKIP_WAITING or AQUANEV_NOTIFY). Unknown messages are ignored.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "Deliver a push event. The payload is parsed as JSON; missing fields use defaults.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(
        description = "Click a displayed notification by tag, optionally choosing an action. Focuses or opens the application window."
    )]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "Deliver a background sync event. The application sync tag is broadcast to every client.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "Open a page context (window or worker) in the simulated browser.")]
    async fn clients_open(&self, params: Parameters<ClientsOpenParams>) -> Result<CallToolResult, McpError> {
        open_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "List cache partitions with entry counts, marking the ones owned by the current version.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker).await
    }
}

impl ServerHandler for AquanevServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "aquanev-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
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
