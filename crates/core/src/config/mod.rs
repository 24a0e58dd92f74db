//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BIMVIEW_*)
//! 2. TOML config file (if BIMVIEW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BIMVIEW_*)
/// 2. TOML config file (if BIMVIEW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via BIMVIEW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the application shell is served from. Manifest paths and
    /// relative request URLs are resolved against it.
    ///
    /// Set via BIMVIEW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Deployed version; suffixes every cache generation name.
    ///
    /// Set via BIMVIEW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via BIMVIEW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via BIMVIEW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via BIMVIEW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Paths pre-cached into the static generation on install.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// URL classification rules for the fetch router.
    #[serde(default)]
    pub routes: RouteRules,
}

/// URL classification rules.
///
/// Path rules select the static generation with cache-first retrieval.
/// Host markers select network-first; so does anything unmatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRules {
    /// Paths treated as the application document.
    #[serde(default = "default_document_paths")]
    pub document_paths: Vec<String>,

    /// Path prefixes of the application's own sources and vendored scripts.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// Path prefixes of PWA auxiliary assets.
    #[serde(default = "default_pwa_prefixes")]
    pub pwa_prefixes: Vec<String>,

    /// Exact PWA auxiliary paths (manifest, worker script, platform config).
    #[serde(default = "default_pwa_paths")]
    pub pwa_paths: Vec<String>,

    /// Hostname substrings of CDN and local-development hosts.
    #[serde(default = "default_dynamic_host_markers")]
    pub dynamic_host_markers: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./bimview-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_version() -> String {
    "1.0.0".into()
}

fn default_user_agent() -> String {
    "bimview/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_static_assets() -> Vec<String> {
    ["/", "/index.html", "/src/main.ts", "/src/style.css", "/manifest.json", "/sw.js", "/browserconfig.xml"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_document_paths() -> Vec<String> {
    vec!["/".into(), "/index.html".into()]
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/src/".into(), "/node_modules/".into()]
}

fn default_pwa_prefixes() -> Vec<String> {
    vec!["/icons/".into()]
}

fn default_pwa_paths() -> Vec<String> {
    vec!["/manifest.json".into(), "/sw.js".into(), "/browserconfig.xml".into()]
}

fn default_dynamic_host_markers() -> Vec<String> {
    vec!["unpkg.com".into(), "cdn".into(), "localhost".into()]
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            document_paths: default_document_paths(),
            static_prefixes: default_static_prefixes(),
            pwa_prefixes: default_pwa_prefixes(),
            pwa_paths: default_pwa_paths(),
            dynamic_host_markers: default_dynamic_host_markers(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_version: default_cache_version(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            static_assets: default_static_assets(),
            routes: RouteRules::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BIMVIEW_`
    /// 2. TOML file from `BIMVIEW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// Nested keys use `__`, e.g. `BIMVIEW_ROUTES__DYNAMIC_HOST_MARKERS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BIMVIEW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(
            Env::prefixed("BIMVIEW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        ))
    }

    /// Extract and validate a configuration from an assembled figment.
    pub(crate) fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
