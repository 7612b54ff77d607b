//! Metrics and observability
//!
//! Per-pool atomic counters for the hot path, optionally exported to
//! Prometheus.

mod counters;
mod exporter;

pub use counters::*;
pub use exporter::{describe_metrics, init_metrics, publish, spawn_publisher};
