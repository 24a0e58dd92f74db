//! Request classification.
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. Non-GET requests pass through untouched.
//! 2. Document paths (`/`, `/index.html`) are cache-first.
//! 3. App source and vendored prefixes (`/src/`, `/node_modules/`) are cache-first.
//! 4. PWA assets (`/icons/` prefix, manifest, worker script, platform config) are cache-first.
//! 5. Hosts containing a CDN or local-development marker are network-first.
//! 6. Everything else is network-first.
//!
//! Path rules ignore the host, so `https://other.example/src/x.js` is an app asset.

use bimview_core::{GenerationKind, RouteRules};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

/// Retrieval policy for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
}

/// Which rule matched a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    Document,
    AppAsset,
    PwaAsset,
    External,
    Dynamic,
}

impl RequestClass {
    pub fn strategy(self) -> Strategy {
        match self {
            RequestClass::Document | RequestClass::AppAsset | RequestClass::PwaAsset => Strategy::CacheFirst,
            RequestClass::External | RequestClass::Dynamic => Strategy::NetworkFirst,
        }
    }

    /// Generation that successful responses are stored in.
    pub fn generation(self) -> GenerationKind {
        match self.strategy() {
            Strategy::CacheFirst => GenerationKind::Static,
            Strategy::NetworkFirst => GenerationKind::Dynamic,
        }
    }
}

/// Routing decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted: no cache read or write happens.
    Passthrough,
    Intercept(RequestClass),
}

/// Pure classifier over the configured rule lists.
#[derive(Debug, Clone)]
pub struct Router {
    rules: RouteRules,
}

impl Router {
    pub fn new(rules: RouteRules) -> Self {
        Self { rules }
    }

    pub fn classify(&self, method: &Method, url: &Url) -> Route {
        if *method != Method::GET {
            return Route::Passthrough;
        }

        let path = url.path();
        let rules = &self.rules;

        let class = if rules.document_paths.iter().any(|p| p == path) {
            RequestClass::Document
        } else if rules.static_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            RequestClass::AppAsset
        } else if rules.pwa_prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || rules.pwa_paths.iter().any(|p| p == path)
        {
            RequestClass::PwaAsset
        } else if url
            .host_str()
            .is_some_and(|host| rules.dynamic_host_markers.iter().any(|m| host.contains(m.as_str())))
        {
            RequestClass::External
        } else {
            RequestClass::Dynamic
        };

        Route::Intercept(class)
    }
}
