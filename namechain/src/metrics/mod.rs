//! Metrics for the virtual-chain engine.
//!
//! This module exposes:
//!
//! - [`MetricsRegistry`]: a Prometheus registry plus strongly-typed
//!   engine metrics,
//! - [`run_prometheus_http_server`]: an async `/metrics` exporter.

mod prometheus;

pub use prometheus::{EngineMetrics, MetricsRegistry, run_prometheus_http_server};
