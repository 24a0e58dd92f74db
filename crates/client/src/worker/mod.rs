//! Offline worker: the cache lifecycle controller.
//!
//! The worker pre-caches the asset manifest on install, collects stale
//! generations on activate, and answers intercepted requests with either
//! cache-first or network-first retrieval.
//!
//! Successful network responses are stored on a background task after the
//! response is handed back, so a slow store never delays the caller.
//! [`OfflineWorker::settle`] waits for outstanding stores.

pub mod fallback;
pub mod lifecycle;
pub mod push;
pub mod router;
mod strategy;

pub use lifecycle::AssetManifest;
pub use router::{RequestClass, Route, Router, Strategy};

use crate::fetch::{FetchResponse, Network, resolve};
use bimview_core::{AppConfig, CacheDb, CacheGenerations, CachedEntry, Error, WorkerEvent, WorkerState};
use bytes::Bytes;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinSet;

const EVENT_CAPACITY: usize = 16;

/// A request as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRequest {
    pub method: Method,
    pub url: Url,
}

impl WorkerRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    Fallback,
}

/// Response returned to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl WorkerResponse {
    pub fn from_network(response: &FetchResponse) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &response.headers {
            let Ok(value) = value.to_str() else { continue };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        Self {
            url: response.url.to_string(),
            status: response.status.as_u16(),
            content_type: response.content_type.clone(),
            headers,
            body: response.bytes.clone(),
            source: ResponseSource::Network,
        }
    }

    pub fn from_cache(entry: CachedEntry) -> Self {
        let headers = entry
            .headers_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default();

        Self {
            url: entry.url,
            status: entry.status_code,
            content_type: entry.content_type,
            headers,
            body: Bytes::from(entry.body),
            source: ResponseSource::Cache,
        }
    }

    /// Snapshot for the cache store.
    pub fn to_entry(&self, method: &Method) -> CachedEntry {
        CachedEntry::new(
            method.as_str(),
            &self.url,
            self.status,
            self.content_type.clone(),
            serde_json::to_string(&self.headers).ok(),
            self.body.to_vec(),
        )
    }

    /// 2xx, the only responses that are ever stored.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Result of offering a request to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The worker declined the request; the caller goes to the network itself.
    Passthrough,
    Responded(WorkerResponse),
}

/// The offline cache lifecycle controller for one deployed version.
pub struct OfflineWorker {
    db: CacheDb,
    network: Arc<dyn Network>,
    origin: Url,
    version: String,
    generations: CacheGenerations,
    manifest: AssetManifest,
    router: Router,
    state: RwLock<WorkerState>,
    events: broadcast::Sender<WorkerEvent>,
    pending: Mutex<JoinSet<()>>,
}

impl OfflineWorker {
    /// Build a worker from loaded configuration.
    pub fn new(db: CacheDb, network: Arc<dyn Network>, config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {}", config.origin, e)))?;
        let manifest = AssetManifest::resolve(&origin, &config.static_assets)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            db,
            network,
            origin,
            version: config.cache_version.clone(),
            generations: CacheGenerations::for_version(&config.cache_version),
            manifest,
            router: Router::new(config.routes.clone()),
            state: RwLock::new(WorkerState::Parsed),
            events,
            pending: Mutex::new(JoinSet::new()),
        })
    }

    /// Resolve a path or absolute URL the way the page would request it.
    pub fn resolve_url(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn generations(&self) -> &CacheGenerations {
        &self.generations
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Receive lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Offer an intercepted request to the worker.
    ///
    /// Only an activated worker controls requests; in every other state the
    /// request passes through. The state lock is held for the whole call, so
    /// activation never starts deleting generations under a request in flight.
    ///
    /// Network failures are recovered into fallback responses. Cache store
    /// failures are returned as errors.
    pub async fn handle_fetch(&self, request: &WorkerRequest) -> Result<FetchOutcome, Error> {
        let state = self.state.read().await;
        if *state != WorkerState::Activated {
            tracing::debug!(state = %*state, url = %request.url, "not controlling, passthrough");
            return Ok(FetchOutcome::Passthrough);
        }

        let class = match self.router.classify(&request.method, &request.url) {
            Route::Passthrough => {
                tracing::debug!(method = %request.method, url = %request.url, "passthrough");
                return Ok(FetchOutcome::Passthrough);
            }
            Route::Intercept(class) => class,
        };

        let generation = self.generations.name(class.generation());
        tracing::debug!(url = %request.url, ?class, generation, "intercepted");

        let response = match class.strategy() {
            Strategy::CacheFirst => self.cache_first(request, generation).await?,
            Strategy::NetworkFirst => self.network_first(request, generation).await?,
        };

        Ok(FetchOutcome::Responded(response))
    }

    /// Answer a request the way a page would see it.
    ///
    /// Passthrough requests go straight to the network and their failures
    /// are not recovered.
    pub async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        match self.handle_fetch(request).await? {
            FetchOutcome::Responded(response) => Ok(response),
            FetchOutcome::Passthrough => self.passthrough(request).await,
        }
    }

    /// Send a declined request straight to the network.
    pub async fn passthrough(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        let response = self.network.fetch(&request.method, &request.url).await?;
        Ok(WorkerResponse::from_network(&response))
    }

    /// Wait for every background store spawned so far.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background store task failed");
            }
        }
    }

    /// Store a successful response after it has been returned.
    async fn store_after_respond(&self, generation: &str, method: &Method, response: &WorkerResponse) {
        if !response.is_success() {
            return;
        }

        let entry = response.to_entry(method);
        let db = self.db.clone();
        let generation = generation.to_string();

        let mut pending = self.pending.lock().await;
        while let Some(result) = pending.try_join_next() {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background store task failed");
            }
        }
        pending.spawn(async move {
            match db.put_entry(&generation, &entry).await {
                Ok(()) => tracing::debug!(url = %entry.url, %generation, "stored"),
                Err(e) => tracing::warn!(url = %entry.url, %generation, error = %e, "store failed"),
            }
        });
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
    }

    fn emit(&self, event: WorkerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_new_worker_is_parsed() {
        let worker = worker(StubNetwork::new()).await;
        assert_eq!(worker.state().await, WorkerState::Parsed);
        assert_eq!(worker.version(), "1.0.0");
        assert_eq!(worker.generations().static_name, "bim-static-v1.0.0");
        assert_eq!(worker.manifest().len(), 7);
    }

    #[tokio::test]
    async fn test_resolve_url() {
        let worker = worker(StubNetwork::new()).await;
        assert_eq!(worker.resolve_url("/sw.js").unwrap().as_str(), "http://localhost:5173/sw.js");
        assert_eq!(worker.resolve_url("https://UNPKG.com/three#x").unwrap().as_str(), "https://unpkg.com/three");
        assert!(matches!(worker.resolve_url(""), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_invalid_origin_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        let result = OfflineWorker::new(db, StubNetwork::new(), &config);
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_post_is_never_intercepted() {
        let network = StubNetwork::new();
        let target = url("/src/main.ts");
        network.serve(target.as_str(), 200, "fresh");
        let worker = active_worker(network.clone()).await;

        let request = WorkerRequest::new(Method::POST, target.clone());
        assert_eq!(worker.handle_fetch(&request).await.unwrap(), FetchOutcome::Passthrough);
        assert_eq!(network.calls(), 0);

        // Passthrough via `fetch` hits the network and stores nothing.
        let response = worker.fetch(&request).await.unwrap();
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.text(), "fresh");
        worker.settle().await;
        assert_eq!(worker.db().count_matches("GET", target.as_str()).await.unwrap(), 0);
        assert_eq!(worker.db().count_matches("POST", target.as_str()).await.unwrap(), 0);
        assert!(worker.db().generation_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_passthrough_network_error_propagates() {
        let network = StubNetwork::new();
        network.set_offline(true);
        let worker = worker(network).await;

        let request = WorkerRequest::new(Method::POST, url("/api/models"));
        let err = worker.fetch(&request).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_response_header_round_trip_through_cache() {
        let mut fetched = FetchResponse::new(url("/src/style.css"), reqwest::StatusCode::OK, Some("text/css"), "body{}");
        fetched.headers.append("x-trace", "a".parse().unwrap());
        fetched.headers.append("x-trace", "b".parse().unwrap());

        let response = WorkerResponse::from_network(&fetched);
        assert_eq!(response.headers.get("x-trace").map(String::as_str), Some("a, b"));

        let restored = WorkerResponse::from_cache(response.to_entry(&Method::GET));
        assert_eq!(restored.headers, response.headers);
        assert_eq!(restored.body, response.body);
        assert_eq!(restored.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_redundant_worker_passes_through() {
        let network = StubNetwork::new();
        let worker = worker(network.clone()).await;
        worker.set_state(WorkerState::Redundant).await;

        let outcome = worker.handle_fetch(&WorkerRequest::get(url("/"))).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Passthrough);
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_activating_worker_does_not_serve_stale_generations() {
        let network = StubNetwork::new();
        let worker = worker_with_version(network.clone(), "1.1.0").await;
        let target = url("/src/main.ts");
        let stale = CachedEntry::new("GET", target.as_str(), 200, None, None, b"stale v1.0.0".to_vec());
        worker.db().put_entry("bim-static-v1.0.0", &stale).await.unwrap();

        worker.set_state(WorkerState::Activating).await;

        let outcome = worker.handle_fetch(&WorkerRequest::get(target)).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Passthrough);
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_uncontrolled_states_pass_through() {
        let network = StubNetwork::new();
        network.serve(url("/src/main.ts").as_str(), 200, "main");
        let worker = worker(network.clone()).await;

        for state in [WorkerState::Parsed, WorkerState::Installing, WorkerState::Installed] {
            worker.set_state(state).await;
            let outcome = worker.handle_fetch(&WorkerRequest::get(url("/src/main.ts"))).await.unwrap();
            assert_eq!(outcome, FetchOutcome::Passthrough, "{state}");
        }

        let response = worker.fetch(&WorkerRequest::get(url("/src/main.ts"))).await.unwrap();
        assert_eq!(response.source, ResponseSource::Network);
        worker.settle().await;
        assert!(worker.db().generation_names().await.unwrap().is_empty());
    }
}
