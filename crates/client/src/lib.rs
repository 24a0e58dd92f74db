//! Network-facing code for bimview.
//!
//! This crate provides the HTTP fetch pipeline and the offline worker that
//! sits between the page and the network, shared by the server and CLI.

pub mod fetch;
pub mod worker;

pub use reqwest::{Method, StatusCode, Url};

pub use fetch::{FetchClient, FetchConfig, FetchResponse, Network};
pub use worker::{FetchOutcome, OfflineWorker, ResponseSource, WorkerRequest, WorkerResponse};
