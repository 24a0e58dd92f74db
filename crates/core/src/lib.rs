//! Core types and shared functionality for bimview.
//!
//! This crate provides:
//! - Versioned request/response cache store with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - Worker lifecycle states and page-side PWA state
//! - Typed settings service with change broadcasting

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pwa;
pub mod settings;

pub use cache::{CacheDb, CacheGenerations, CacheHit, CachedEntry, GenerationKind};
pub use config::{AppConfig, ConfigError, RouteRules};
pub use error::Error;
pub use lifecycle::{WorkerEvent, WorkerState};
pub use pwa::{PwaMonitor, PwaStatus};
pub use settings::SettingsService;
