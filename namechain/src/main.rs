// src/main.rs
//
// Standalone indexer node that wires up the namechain library:
//
// - HTTP JSON-RPC block source
// - Filesystem snapshot store under the working directory
// - Prometheus metrics exporter on /metrics
// - The virtual-chain driver on a blocking task, stopping cleanly on
//   Ctrl-C after the in-flight block commits.
//
// The query endpoint lives in the `api-gateway` crate; this binary only
// indexes.

use std::sync::Arc;

use namechain::{
    ChainConfig, ChainDriver, FsSnapshotStore, HttpBlockSource, MetricsRegistry,
    run_prometheus_http_server, storage::fs::FsStoreConfig,
};

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "namechain=info".to_string()),
        )
        .init();

    if let Err(err) = run_node().await {
        tracing::error!("fatal error: {err}");
        std::process::exit(1);
    }
}

async fn run_node() -> Result<(), String> {
    // For now, just use defaults. Later this can load from a file/CLI/env.
    let cfg = ChainConfig::default();

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::warn!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{addr}/metrics");
    }

    // ---------------------------
    // Block source + snapshot store
    // ---------------------------

    let source = Arc::new(
        HttpBlockSource::new(&cfg.node, cfg.rpc_timeout)
            .map_err(|e| format!("failed to create block source: {e}"))?,
    );

    let store = FsSnapshotStore::open(FsStoreConfig {
        dir: cfg.snapshot_dir(),
        retain: cfg.consensus_window,
    })
    .map_err(|e| format!("failed to open snapshot store: {e}"))?;

    // ---------------------------
    // Driver
    // ---------------------------

    let (mut driver, handle) = ChainDriver::bootstrap(&cfg, source, store, metrics)
        .map_err(|e| format!("failed to bootstrap driver: {e}"))?;

    tracing::info!(
        height = handle.committed().height,
        start_block = cfg.start_block,
        "indexer starting"
    );

    let driver_handle = handle.clone();
    let driver_task = tokio::task::spawn_blocking(move || driver.run());

    // Ctrl-C requests shutdown; the driver finishes its in-flight block.
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    driver_handle.request_shutdown();

    match driver_task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("driver failed: {e}")),
        Err(e) => Err(format!("driver task panicked: {e}")),
    }
}
