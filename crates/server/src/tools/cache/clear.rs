//! cache_clear tool implementation.
//!
//! Deletes one cache generation, or all of them.

use crate::tools::json_result;
use bimview_client::OfflineWorker;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Generation to delete. Omit to delete every generation.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Number of generations deleted.
    pub deleted: u64,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(worker: &OfflineWorker, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let db = worker.db();

    let deleted = match params.generation {
        Some(name) => u64::from(db.delete_generation(&name).await?),
        None => db.clear_generations().await?,
    };

    tracing::info!(deleted, "cleared cache generations");
    json_result(&CacheClearOutput { deleted })
}
