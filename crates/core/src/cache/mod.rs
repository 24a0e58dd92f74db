//! SQLite-backed request/response store partitioned into cache generations.
//!
//! This module provides a persistent store for fetched responses using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named, version-tagged generations (`bim-static-v1.0.0`, ...)
//! - UPSERT semantics per URL (last write wins)
//! - All-or-nothing batch writes for install-time pre-caching
//! - Generation-agnostic lookups across every generation
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheHit, CachedEntry};
pub use generations::{CacheGenerations, GenerationKind, GenerationStats};
