//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    cache::{self, CacheClearParams, CacheGetParams},
    offline::{self, OfflineFetchParams},
    pwa::{self, BackgroundSyncParams, NotificationClickParams, PushNotifyParams, PwaStatusParams},
    settings::{self, SettingsExportParams, SettingsGetParams, SettingsUpdateParams},
};

use bimview_client::OfflineWorker;
use bimview_core::{PwaMonitor, SettingsService};
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
use std::sync::Arc;
use tokio::sync::Mutex;

/// The main MCP server handler for bimview.
#[derive(Clone)]
pub struct BimViewServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<OfflineWorker>,
    settings: Arc<SettingsService>,
    monitor: Arc<Mutex<PwaMonitor>>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl BimViewServer {
    /// Create a new server handler over the composed services.
    pub fn new(worker: Arc<OfflineWorker>, settings: Arc<SettingsService>, monitor: Arc<Mutex<PwaMonitor>>) -> Self {
        Self { tool_router: Self::tool_router(), worker, settings, monitor }
    }

    #[tool(
        description = "Request a URL through the offline worker. GET requests are routed cache-first or network-first; other methods bypass the cache."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        offline::fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Pre-cache the static asset manifest. Fails as a whole if any asset cannot be fetched.")]
    async fn offline_install(&self) -> Result<CallToolResult, McpError> {
        offline::install_impl(&self.worker).await
    }

    #[tool(description = "Delete stale cache generations and take control of clients.")]
    async fn offline_activate(&self) -> Result<CallToolResult, McpError> {
        offline::activate_impl(&self.worker).await
    }

    #[tool(description = "List cache generations with entry counts and sizes.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        cache::list_impl(&self.worker).await
    }

    #[tool(description = "Retrieve a cached response by URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete one cache generation, or all of them.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        cache::clear_impl(&self.worker, params.0).await
    }

    #[tool(description = "Read one settings category: profile, preferences, security, notifications, data or app.")]
    async fn settings_get(&self, params: Parameters<SettingsGetParams>) -> Result<CallToolResult, McpError> {
        settings::get_impl(&self.settings, params.0).await
    }

    #[tool(description = "Apply a partial update to one settings category.")]
    async fn settings_update(&self, params: Parameters<SettingsUpdateParams>) -> Result<CallToolResult, McpError> {
        settings::update_impl(&self.settings, params.0).await
    }

    #[tool(description = "Export profile and application settings as json, csv or tsv.")]
    async fn settings_export(&self, params: Parameters<SettingsExportParams>) -> Result<CallToolResult, McpError> {
        settings::export_impl(&self.settings, params.0).await
    }

    #[tool(description = "Clear every cache generation and stored settings document.")]
    async fn settings_reset(&self) -> Result<CallToolResult, McpError> {
        settings::reset_impl(&self.settings).await
    }

    #[tool(description = "Check for a newer application version.")]
    async fn check_for_updates(&self) -> Result<CallToolResult, McpError> {
        settings::check_updates_impl(&self.settings).await
    }

    #[tool(description = "Build the notification shown for a push event.")]
    async fn push_notify(&self, params: Parameters<PushNotifyParams>) -> Result<CallToolResult, McpError> {
        pwa::push_impl(params.0).await
    }

    #[tool(description = "Resolve what a notification click does.")]
    async fn notification_click(&self, params: Parameters<NotificationClickParams>) -> Result<CallToolResult, McpError> {
        pwa::click_impl(params.0).await
    }

    #[tool(description = "Dispatch a background sync by tag.")]
    async fn background_sync(&self, params: Parameters<BackgroundSyncParams>) -> Result<CallToolResult, McpError> {
        pwa::sync_impl(params.0).await
    }

    #[tool(description = "Report page-side PWA state, optionally recording connectivity or install prompt changes.")]
    async fn pwa_status(&self, params: Parameters<PwaStatusParams>) -> Result<CallToolResult, McpError> {
        let worker = self.worker.state().await;
        pwa::status_impl(&self.monitor, worker, params.0).await
    }
}

impl ServerHandler for BimViewServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "bimview".into(),
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
