//! cache_list tool implementation.
//!
//! Lists every cache generation with its entry count and size.

use crate::tools::json_result;
use bimview_client::OfflineWorker;
use bimview_core::cache::GenerationStats;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationSummary {
    #[serde(flatten)]
    pub stats: GenerationStats,
    /// Whether activation keeps this generation.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub static_generation: String,
    pub dynamic_generation: String,
    pub generations: Vec<GenerationSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let names = worker.generations();
    let generations = worker
        .db()
        .generation_stats()
        .await?
        .into_iter()
        .map(|stats| GenerationSummary { current: names.is_current(&stats.name), stats })
        .collect();

    let output = CacheListOutput {
        static_generation: names.static_name.clone(),
        dynamic_generation: names.dynamic_name.clone(),
        generations,
    };

    json_result(&output)
}
