//! Post-load checks for `AppConfig`.
//!
//! Hard limits reject the configuration; routing rules that are legal but
//! likely to misclassify only warn.

use crate::config::AppConfig;
use thiserror::Error;

const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;
const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 100..=300_000;
const MIN_HOST_MARKER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Reject values the worker cannot run with.
    ///
    /// Fails on: a zero or over-50MB body cap, a timeout outside 100ms..=5min,
    /// a blank user agent or cache version, a non-http(s) origin, and an
    /// empty manifest or a manifest path without a leading `/`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 || self.max_bytes > MAX_BODY_BYTES {
            return Err(invalid("max_bytes", format!("must be between 1 and {MAX_BODY_BYTES}")));
        }
        if !TIMEOUT_RANGE_MS.contains(&self.timeout_ms) {
            return Err(invalid("timeout_ms", "must be between 100 and 300000"));
        }

        for (field, value) in [("user_agent", &self.user_agent), ("cache_version", &self.cache_version)] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be blank"));
            }
        }

        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.static_assets.is_empty() {
            return Err(invalid("static_assets", "at least one asset is required"));
        }
        if let Some(path) = self.static_assets.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("static_assets", format!("not an origin path: {path}")));
        }

        let short: Vec<&str> = self
            .routes
            .dynamic_host_markers
            .iter()
            .map(String::as_str)
            .filter(|m| m.len() < MIN_HOST_MARKER_LEN)
            .collect();
        if !short.is_empty() {
            tracing::warn!(?short, "host markers match as substrings; short ones may catch unrelated hosts");
        }

        Ok(())
    }
}
