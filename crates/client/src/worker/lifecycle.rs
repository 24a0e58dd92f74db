//! Install and activate phases.

use super::{OfflineWorker, WorkerResponse};
use crate::fetch::resolve;
use bimview_core::{Error, GenerationKind, WorkerEvent, WorkerState};
use reqwest::{Method, Url};

/// Ordered, de-duplicated list of app-shell URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    urls: Vec<Url>,
}

impl AssetManifest {
    /// Resolve manifest paths against the application origin.
    pub fn resolve(origin: &Url, paths: &[String]) -> Result<Self, Error> {
        let mut urls: Vec<Url> = Vec::with_capacity(paths.len());
        for path in paths {
            let url = resolve(origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl OfflineWorker {
    /// Pre-cache the asset manifest into the static generation.
    ///
    /// Every asset must fetch with a success status; otherwise nothing is
    /// stored and the worker becomes redundant. Returns the number of
    /// assets committed.
    pub async fn install(&self) -> Result<usize, Error> {
        {
            let mut state = self.state.write().await;
            if !state.can_install() {
                return Err(Error::InvalidState(format!("cannot install a worker that is {}", *state)));
            }
            *state = WorkerState::Installing;
        }

        tracing::info!(version = %self.version, assets = self.manifest.len(), "installing");

        match self.precache().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed).await;
                tracing::info!(version = %self.version, count, "static assets cached, skip waiting");
                self.emit(WorkerEvent::Installed { version: self.version.clone() });
                Ok(count)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                tracing::error!(version = %self.version, error = %e, "install failed");
                self.emit(WorkerEvent::InstallFailed { version: self.version.clone(), reason: e.to_string() });
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let mut entries = Vec::with_capacity(self.manifest.len());

        for url in self.manifest.urls() {
            let fetched = self.network.fetch(&Method::GET, url).await.map_err(|e| Error::InstallFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

            if !fetched.status.is_success() {
                return Err(Error::InstallFailed { url: url.to_string(), reason: format!("HTTP {}", fetched.status) });
            }

            entries.push(WorkerResponse::from_network(&fetched).to_entry(&Method::GET));
        }

        let count = entries.len();
        self.db.put_batch(self.generations.name(GenerationKind::Static), entries).await?;
        Ok(count)
    }

    /// Delete every generation that is not current, then claim clients.
    ///
    /// Returns the deleted generation names. Re-activating an active worker
    /// runs the collection again.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let previous = {
            let mut state = self.state.write().await;
            if !state.can_activate() {
                return Err(Error::InvalidState(format!("cannot activate a worker that is {}", *state)));
            }
            std::mem::replace(&mut *state, WorkerState::Activating)
        };

        tracing::info!(version = %self.version, "activating");

        let deleted = match self.delete_stale_generations().await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.set_state(previous).await;
                return Err(e);
            }
        };

        self.set_state(WorkerState::Activated).await;
        tracing::info!(version = %self.version, deleted = deleted.len(), "activated, clients claimed");
        self.emit(WorkerEvent::ControllerChanged { version: self.version.clone(), deleted: deleted.clone() });

        Ok(deleted)
    }

    /// Take control again after a restart.
    ///
    /// A fresh worker resumes as activated only when this version's static
    /// generation is on disk and no stale generation is left, which is what a
    /// completed activation leaves behind. Returns whether control resumed.
    pub async fn resume(&self) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        if *state != WorkerState::Parsed {
            return Ok(false);
        }

        let names = self.db.generation_names().await?;
        let installed = names.iter().any(|n| n == self.generations.name(GenerationKind::Static));
        if !installed || !names.iter().all(|n| self.generations.is_current(n)) {
            tracing::debug!(version = %self.version, ?names, "nothing to resume");
            return Ok(false);
        }

        *state = WorkerState::Activated;
        tracing::info!(version = %self.version, "resumed control from cached generation");
        Ok(true)
    }

    async fn delete_stale_generations(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.generation_names().await? {
            if self.generations.is_current(&name) {
                continue;
            }
            if self.db.delete_generation(&name).await? {
                tracing::info!(generation = %name, "deleted stale cache generation");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use bimview_core::CachedEntry;

    #[test]
    fn test_manifest_deduplicates_in_order() {
        let origin = Url::parse(ORIGIN).unwrap();
        let paths: Vec<String> = ["/", "/manifest.json", "/sw.js", "/manifest.json"].map(String::from).to_vec();
        let manifest = AssetManifest::resolve(&origin, &paths).unwrap();

        let urls: Vec<&str> = manifest.urls().iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec!["http://localhost:5173/", "http://localhost:5173/manifest.json", "http://localhost:5173/sw.js"]
        );
    }

    #[tokio::test]
    async fn test_install_commits_whole_manifest() {
        let network = StubNetwork::new();
        serve_manifest(&network);
        let worker = worker(network).await;
        let mut events = worker.subscribe();

        let count = worker.install().await.unwrap();
        assert_eq!(count, 7);
        assert_eq!(worker.state().await, WorkerState::Installed);

        let urls = worker.db().generation_urls("bim-static-v1.0.0").await.unwrap();
        assert_eq!(urls.len(), 7);
        assert!(urls.contains(&"http://localhost:5173/browserconfig.xml".to_string()));

        assert_eq!(events.recv().await.unwrap(), WorkerEvent::Installed { version: "1.0.0".into() });
    }

    #[tokio::test]
    async fn test_install_is_atomic_when_one_asset_fails() {
        let network = StubNetwork::new();
        serve_manifest(&network);
        network.remove(url("/src/style.css").as_str());
        let worker = worker(network).await;
        let mut events = worker.subscribe();

        let err = worker.install().await.unwrap_err();
        match err {
            Error::InstallFailed { url, .. } => assert_eq!(url, "http://localhost:5173/src/style.css"),
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(worker.state().await, WorkerState::Redundant);
        assert!(worker.db().generation_urls("bim-static-v1.0.0").await.unwrap().is_empty());
        assert!(worker.db().match_any("GET", "http://localhost:5173/").await.unwrap().is_none());
        assert!(matches!(events.recv().await.unwrap(), WorkerEvent::InstallFailed { .. }));

        // A failed worker never activates.
        assert!(matches!(worker.activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_install_rejects_non_success_status() {
        let network = StubNetwork::new();
        serve_manifest(&network);
        network.serve(url("/sw.js").as_str(), 404, "missing");
        let worker = worker(network).await;

        let err = worker.install().await.unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));
        assert!(worker.db().generation_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let network = StubNetwork::new();
        serve_manifest(&network);
        let worker = worker(network).await;

        worker.install().await.unwrap();
        assert!(matches!(worker.install().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let worker = worker(StubNetwork::new()).await;
        assert!(matches!(worker.activate().await, Err(Error::InvalidState(_))));
        assert_eq!(worker.state().await, WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_generations() {
        let network = StubNetwork::new();
        serve_manifest(&network);
        let worker = worker_with_version(network, "1.1.0").await;
        let db = worker.db();

        let seed = |u: &str| CachedEntry::new("GET", u, 200, None, None, b"old".to_vec());
        db.put_entry("bim-viewer-v1.0.0", &seed("http://localhost:5173/")).await.unwrap();
        db.put_entry("bim-static-v1.0.0", &seed("http://localhost:5173/src/main.ts")).await.unwrap();
        db.put_entry("bim-dynamic-v1.0.0", &seed("https://unpkg.com/three")).await.unwrap();
        db.put_entry("bim-dynamic-v1.1.0", &seed("https://unpkg.com/three")).await.unwrap();

        worker.install().await.unwrap();
        let mut events = worker.subscribe();

        let mut deleted = worker.activate().await.unwrap();
        deleted.sort();
        assert_eq!(deleted, vec!["bim-dynamic-v1.0.0", "bim-static-v1.0.0", "bim-viewer-v1.0.0"]);

        let mut remaining = db.generation_names().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["bim-dynamic-v1.1.0", "bim-static-v1.1.0"]);
        assert_eq!(worker.state().await, WorkerState::Activated);

        match events.recv().await.unwrap() {
            WorkerEvent::ControllerChanged { version, deleted } => {
                assert_eq!(version, "1.1.0");
                assert_eq!(deleted.len(), 3);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reactivate_is_idempotent() {
        let network = StubNetwork::new();
        serve_manifest(&network);
        let worker = worker(network).await;

        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        assert!(worker.activate().await.unwrap().is_empty());
        assert_eq!(worker.state().await, WorkerState::Activated);
        assert_eq!(worker.db().generation_names().await.unwrap(), vec!["bim-static-v1.0.0"]);
    }

    #[tokio::test]
    async fn test_resume_after_completed_activation() {
        let worker = worker(StubNetwork::new()).await;
        assert!(!worker.resume().await.unwrap());

        worker.db().open_generation("bim-static-v1.0.0").await.unwrap();
        assert!(worker.resume().await.unwrap());
        assert_eq!(worker.state().await, WorkerState::Activated);
        assert!(!worker.resume().await.unwrap());
    }

    #[tokio::test]
    async fn test_resume_refuses_while_stale_generations_remain() {
        let worker = worker_with_version(StubNetwork::new(), "1.1.0").await;
        worker.db().open_generation("bim-static-v1.1.0").await.unwrap();
        worker.db().open_generation("bim-static-v1.0.0").await.unwrap();

        assert!(!worker.resume().await.unwrap());
        assert_eq!(worker.state().await, WorkerState::Parsed);
    }
}
