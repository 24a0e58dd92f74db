//! cache_get tool implementation.
//!
//! Retrieves a cached response by URL, from one generation or any.

use crate::tools::json_result;
use bimview_client::OfflineWorker;
use bimview_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// A path on the application origin or an absolute URL.
    pub url: String,

    /// Only look in this generation. Defaults to searching all of them.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub generation: String,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub stored_at: String,
    pub bytes: usize,
    /// Body decoded as UTF-8, lossy.
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &OfflineWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = worker.resolve_url(&params.url)?;
    let db = worker.db();

    let found = match params.generation {
        Some(generation) => db
            .match_in(&generation, "GET", url.as_str())
            .await?
            .map(|entry| (generation, entry)),
        None => db
            .match_any("GET", url.as_str())
            .await?
            .map(|hit| (hit.generation, hit.entry)),
    };

    let (generation, entry) = found.ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheGetOutput {
        generation,
        bytes: entry.body.len(),
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        url: entry.url,
        status_code: entry.status_code,
        content_type: entry.content_type,
        stored_at: entry.stored_at,
    };

    json_result(&output)
}
