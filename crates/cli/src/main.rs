//! bimview command-line entry point.
//!
//! Every subcommand prints one JSON document to stdout; logs go to stderr.

mod cli;
mod validate;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use bimview_client::{FetchClient, FetchConfig, FetchOutcome, Method, OfflineWorker, ResponseSource, WorkerRequest};
use bimview_core::cache::GenerationStats;
use bimview_core::{AppConfig, CacheDb, WorkerState};
use clap::Parser;
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, ClearArgs, Command, FetchArgs, InstallArgs};

#[derive(Debug, Serialize)]
struct FetchOutput {
    url: String,
    status: u16,
    content_type: Option<String>,
    source: Option<ResponseSource>,
    bytes: usize,
    body: String,
}

#[derive(Debug, Serialize)]
struct GenerationOutput {
    #[serde(flatten)]
    stats: GenerationStats,
    current: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let (result, passed) = match cli.command {
        Command::Validate(args) => {
            let report = validate::validate(&args.dir);
            let ok = report.ok();
            (serde_json::to_value(&report).map_err(anyhow::Error::from), ok)
        }
        command => (run(command).await, true),
    };

    match result {
        Ok(output) => {
            emit(&output, cli.pretty);
            if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            emit(&json!({ "error": format!("{e:#}") }), cli.pretty);
            ExitCode::FAILURE
        }
    }
}

fn emit(value: &Value, pretty: bool) {
    let text = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    match text {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("failed to encode output: {e}"),
    }
}

async fn open_worker() -> Result<OfflineWorker> {
    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    Ok(OfflineWorker::new(db, network, &config)?)
}

async fn run(command: Command) -> Result<Value> {
    let worker = open_worker().await?;

    let output = match command {
        Command::Install(args) => install(&worker, args).await?,
        Command::Fetch(args) => fetch(&worker, args).await?,
        Command::Caches => {
            let generations: Vec<GenerationOutput> = worker
                .db()
                .generation_stats()
                .await?
                .into_iter()
                .map(|stats| GenerationOutput { current: worker.generations().is_current(&stats.name), stats })
                .collect();
            json!({ "version": worker.version(), "generations": generations })
        }
        Command::Clear(ClearArgs { generation }) => match generation {
            Some(name) => json!({ "generation": name, "deleted": worker.db().delete_generation(&name).await? }),
            None => json!({ "deleted": worker.db().clear_generations().await? }),
        },
        Command::Validate(_) => anyhow::bail!("validate does not open the cache"),
    };

    worker.settle().await;
    Ok(output)
}

async fn install(worker: &OfflineWorker, args: InstallArgs) -> Result<Value> {
    let cached = worker.install().await?;
    let deleted = if args.no_activate { Vec::new() } else { worker.activate().await? };
    let state: WorkerState = worker.state().await;

    Ok(json!({ "version": worker.version(), "state": state, "cached": cached, "deleted": deleted }))
}

async fn fetch(worker: &OfflineWorker, args: FetchArgs) -> Result<Value> {
    let method = Method::from_bytes(args.method.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method: {}", args.method))?;
    let request = WorkerRequest::new(method, worker.resolve_url(&args.url)?);
    worker.resume().await?;

    let (response, source) = match worker.handle_fetch(&request).await? {
        FetchOutcome::Responded(response) => {
            let source = Some(response.source);
            (response, source)
        }
        FetchOutcome::Passthrough => (worker.passthrough(&request).await?, None),
    };

    let output = FetchOutput {
        url: response.url.clone(),
        status: response.status,
        content_type: response.content_type.clone(),
        source,
        bytes: response.body.len(),
        body: response.text().into_owned(),
    };
    Ok(serde_json::to_value(output)?)
}
