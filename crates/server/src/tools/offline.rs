//! offline_fetch, offline_install and offline_activate tools.
//!
//! These drive the offline worker the way a page and its browser would:
//! requests go through the router and retrieval strategies, and the
//! lifecycle phases run on demand.

use super::json_result;
use bimview_client::{FetchOutcome, Method, OfflineWorker, ResponseSource, WorkerRequest};
use bimview_core::{Error, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// A path on the application origin (`/index.html`) or an absolute URL.
    pub url: String,

    /// HTTP method (default: GET). Anything other than GET bypasses the cache.
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// None when the worker declined the request.
    pub source: Option<ResponseSource>,
    pub bytes: usize,
    /// Body decoded as UTF-8, lossy.
    pub body: String,
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(worker: &OfflineWorker, params: OfflineFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method = match params.method.as_deref() {
        None => Method::GET,
        Some(m) => Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {m}")))?,
    };

    let request = WorkerRequest::new(method, worker.resolve_url(&params.url)?);
    let (response, intercepted) = match worker.handle_fetch(&request).await? {
        FetchOutcome::Responded(response) => (response, true),
        FetchOutcome::Passthrough => (worker.passthrough(&request).await?, false),
    };

    let output = OfflineFetchOutput {
        url: response.url.clone(),
        status: response.status,
        content_type: response.content_type.clone(),
        source: intercepted.then_some(response.source),
        bytes: response.body.len(),
        body: response.text().into_owned(),
    };

    json_result(&output)
}

/// Output from the offline_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineInstallOutput {
    pub version: String,
    pub state: WorkerState,
    pub generation: String,
    pub cached: usize,
}

/// Implementation of the offline_install tool.
pub async fn install_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let cached = worker.install().await?;

    let output = OfflineInstallOutput {
        version: worker.version().to_string(),
        state: worker.state().await,
        generation: worker.generations().static_name.clone(),
        cached,
    };

    json_result(&output)
}

/// Output from the offline_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineActivateOutput {
    pub version: String,
    pub state: WorkerState,
    pub deleted: Vec<String>,
}

/// Implementation of the offline_activate tool.
pub async fn activate_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let deleted = worker.activate().await?;

    let output =
        OfflineActivateOutput { version: worker.version().to_string(), state: worker.state().await, deleted };

    json_result(&output)
}
