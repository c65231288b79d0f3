//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed engine metrics, and an async HTTP
//! exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};

/// Virtual-chain engine metrics.
///
/// These are registered into a [`Registry`] and updated by the driver as
/// it processes blocks.
#[derive(Clone)]
pub struct EngineMetrics {
    /// Total blocks fully processed and committed.
    pub blocks_processed: IntCounter,
    /// Total operations accepted into the name database.
    pub ops_accepted: IntCounter,
    /// Total operations rejected by the acceptance rules.
    pub ops_rejected: IntCounter,
    /// Total reorganizations rewound through.
    pub reorgs: IntCounter,
    /// Height of the last committed block.
    pub committed_height: IntGauge,
    /// Latency of full block processing (extract + apply + seal + persist),
    /// in seconds.
    pub block_apply_seconds: Histogram,
}

impl EngineMetrics {
    /// Registers engine metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let blocks_processed = IntCounter::with_opts(Opts::new(
            "engine_blocks_processed",
            "Total number of blocks fully processed and committed",
        ))?;
        registry.register(Box::new(blocks_processed.clone()))?;

        let ops_accepted = IntCounter::with_opts(Opts::new(
            "engine_ops_accepted",
            "Total number of name operations accepted",
        ))?;
        registry.register(Box::new(ops_accepted.clone()))?;

        let ops_rejected = IntCounter::with_opts(Opts::new(
            "engine_ops_rejected",
            "Total number of name operations rejected",
        ))?;
        registry.register(Box::new(ops_rejected.clone()))?;

        let reorgs = IntCounter::with_opts(Opts::new(
            "engine_reorgs",
            "Total number of chain reorganizations rewound through",
        ))?;
        registry.register(Box::new(reorgs.clone()))?;

        let committed_height = IntGauge::with_opts(Opts::new(
            "engine_committed_height",
            "Height of the last committed block",
        ))?;
        registry.register(Box::new(committed_height.clone()))?;

        let block_apply_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "engine_block_apply_seconds",
                "Time to process one block (extract + apply + seal + persist) in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(block_apply_seconds.clone()))?;

        Ok(Self {
            blocks_processed,
            ops_accepted,
            ops_rejected,
            reorgs,
            committed_height,
            block_apply_seconds,
        })
    }
}

/// Wrapper around a Prometheus registry and the engine metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub engine: EngineMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the engine metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("namechain".to_string()), None)?;
        let engine = EngineMetrics::register(&registry)?;
        Ok(Self { registry, engine })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime, e.g.:
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let addr: SocketAddr = "127.0.0.1:9898".parse()?;
/// tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}
