// api-gateway/src/main.rs

//! API gateway binary.
//!
//! This binary exposes the registrar's HTTP API on top of the `namechain`
//! crate:
//!
//! - `GET /ping`, `GET /info`, `GET /names/{name}`
//! - `POST /names/{preorder,register,update,transfer,renew,revoke}`
//! - `POST /namespaces/{preorder,reveal,ready}`
//!
//! It embeds the virtual-chain driver on a blocking task, a Prometheus
//! metrics exporter on `/metrics`, and supervises both: Ctrl-C lets the
//! in-flight block finish its commit before exit, and a fatal driver
//! error flips the endpoint into degraded read-only mode.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;

use namechain::{
    ChainConfig, ChainDriver, DriverError, FsSnapshotStore, HttpBlockSource, HttpUtxoProvider,
    MetricsRegistry, StateHandle, UtxoProviderKind, run_prometheus_http_server,
    storage::fs::FsStoreConfig,
};

use config::ApiConfig;
use routes::{health, names, namespaces};
use state::AppState;

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_gateway=info,namechain=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // For now we use default configs. These can be externalised later.
    let api_cfg = ApiConfig::default();
    let chain_cfg = ChainConfig::default();

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if chain_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = chain_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::warn!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{addr}/metrics");
    }

    // ---------------------------
    // Block source + UTXO provider
    // ---------------------------

    let source = Arc::new(
        HttpBlockSource::new(&chain_cfg.node, chain_cfg.rpc_timeout)
            .map_err(|e| format!("failed to create block source: {e}"))?,
    );

    let utxos = match chain_cfg.utxo_provider.kind {
        UtxoProviderKind::Node => HttpUtxoProvider::new(
            chain_cfg.node.url(),
            chain_cfg.utxo_provider.credentials.clone(),
            chain_cfg.rpc_timeout,
        ),
        UtxoProviderKind::Remote => HttpUtxoProvider::new(
            chain_cfg.utxo_provider.endpoint.clone(),
            chain_cfg.utxo_provider.credentials.clone(),
            chain_cfg.rpc_timeout,
        ),
    }
    .map_err(|e| format!("failed to create UTXO provider: {e}"))?;

    // ---------------------------
    // Snapshot store + driver
    // ---------------------------

    let store = FsSnapshotStore::open(FsStoreConfig {
        dir: chain_cfg.snapshot_dir(),
        retain: chain_cfg.consensus_window,
    })
    .map_err(|e| format!("failed to open snapshot store: {e}"))?;

    let (mut driver, handle) =
        ChainDriver::bootstrap(&chain_cfg, source.clone(), store, metrics.clone())
            .map_err(|e| format!("failed to bootstrap driver: {e}"))?;

    tracing::info!(
        height = handle.committed().height,
        start_block = chain_cfg.start_block,
        "virtual-chain driver starting"
    );

    let driver_task = tokio::task::spawn_blocking(move || driver.run());
    let supervisor = tokio::spawn(supervise_driver(driver_task, handle.clone()));

    // ---------------------------
    // Shared state + HTTP router
    // ---------------------------

    let app_state = AppState::new(handle.clone(), source, Arc::new(utxos));

    let app = Router::new()
        .route("/ping", get(health::ping))
        .route("/info", get(names::getinfo))
        .route("/names/{name}", get(names::lookup))
        .route("/names/preorder", post(names::preorder))
        .route("/names/register", post(names::register))
        .route("/names/update", post(names::update))
        .route("/names/transfer", post(names::transfer))
        .route("/names/renew", post(names::renew))
        .route("/names/revoke", post(names::revoke))
        .route("/namespaces/preorder", post(namespaces::preorder))
        .route("/namespaces/reveal", post(namespaces::reveal))
        .route("/namespaces/ready", post(namespaces::ready))
        .with_state(app_state);

    // ---------------------------
    // axum 0.8 server (hyper 1 style)
    // ---------------------------

    tracing::info!("API gateway listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(handle.clone()))
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    // The shutdown signal already set the flag; wait for the driver to
    // finish its in-flight block and commit.
    let _ = supervisor.await;
    Ok(())
}

/// Waits for the driver task and downgrades the endpoint if it fails.
///
/// A clean exit means shutdown was requested; anything else is fatal for
/// indexing, so the gateway keeps serving lookups from the last good
/// snapshot and refuses constructor requests.
async fn supervise_driver(
    driver_task: tokio::task::JoinHandle<Result<(), DriverError>>,
    handle: Arc<StateHandle>,
) {
    match driver_task.await {
        Ok(Ok(())) => {
            tracing::info!("virtual-chain driver stopped");
        }
        Ok(Err(e)) => {
            tracing::error!("virtual-chain driver failed: {e}");
            handle.set_degraded();
        }
        Err(e) => {
            tracing::error!("virtual-chain driver panicked: {e}");
            handle.set_degraded();
        }
    }
}

/// Waits for Ctrl-C, then asks the driver to stop after its in-flight
/// block.
async fn shutdown_signal(handle: Arc<StateHandle>) {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    handle.request_shutdown();
}
