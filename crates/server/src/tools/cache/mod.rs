//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and clearing cache generations.

pub mod clear;
pub mod get;
pub mod list;

pub use clear::{CacheClearParams, clear_impl};
pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
