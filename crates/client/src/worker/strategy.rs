//! Cache-first and network-first retrieval.
//!
//! Neither strategy retries. Network failures end in a cached or synthetic
//! response; cache store failures propagate.

use super::{OfflineWorker, WorkerRequest, WorkerResponse, fallback};
use bimview_core::Error;

impl OfflineWorker {
    /// Serve from any generation, else fetch and store into `generation`.
    pub(super) async fn cache_first(&self, request: &WorkerRequest, generation: &str) -> Result<WorkerResponse, Error> {
        let url = request.url.as_str();

        if let Some(hit) = self.db.match_any(request.method.as_str(), url).await? {
            tracing::debug!(url, generation = %hit.generation, "cache hit");
            return Ok(WorkerResponse::from_cache(hit.entry));
        }

        match self.network.fetch(&request.method, &request.url).await {
            Ok(fetched) => {
                let response = WorkerResponse::from_network(&fetched);
                self.store_after_respond(generation, &request.method, &response).await;
                Ok(response)
            }
            Err(e) if e.is_network() => {
                tracing::warn!(url, error = %e, "cache-first fetch failed");
                if fallback::wants_offline_page(url) {
                    Ok(fallback::offline_page(url))
                } else {
                    Ok(fallback::network_error(url))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch and store into `generation`, else serve from any generation.
    pub(super) async fn network_first(
        &self, request: &WorkerRequest, generation: &str,
    ) -> Result<WorkerResponse, Error> {
        let url = request.url.as_str();

        match self.network.fetch(&request.method, &request.url).await {
            Ok(fetched) => {
                let response = WorkerResponse::from_network(&fetched);
                self.store_after_respond(generation, &request.method, &response).await;
                Ok(response)
            }
            Err(e) if e.is_network() => {
                tracing::info!(url, error = %e, "network failed, trying cache");
                match self.db.match_any(request.method.as_str(), url).await? {
                    Some(hit) => {
                        tracing::debug!(url, generation = %hit.generation, "cache fallback hit");
                        Ok(WorkerResponse::from_cache(hit.entry))
                    }
                    None => Ok(fallback::connection_error_page(url)),
                }
            }
            Err(e) => Err(e),
        }
    }
}
