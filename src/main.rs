//! Elastic Pool - Load Driver
//!
//! Runs a synthetic producer/consumer workload against an elastic pool.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use elastic_pool::{metrics, workload, Config, Pool, VERSION};

fn main() -> Result<()> {
    // Parse command line arguments
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // Load configuration
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Initialize tracing/logging
    elastic_pool::util::init_tracing(&config.logging)?;

    info!(
        version = VERSION,
        config_path = ?config_path,
        "Starting elastic pool load driver"
    );

    let pool = Arc::new(Pool::with_config(&config.pool).context("Failed to create pool")?);
    info!(
        buffer_capacity = pool.buffer_capacity(),
        max_buffer_count = pool.max_buffer_count(),
        "Pool created"
    );

    // Initialize metrics if enabled
    let publisher = if config.metrics.enabled {
        metrics::init_metrics(&config.metrics)?;
        info!(
            bind_addr = %config.metrics.bind_addr,
            "Metrics endpoint started"
        );
        Some(metrics::spawn_publisher(
            pool.clone(),
            Duration::from_millis(config.metrics.publish_interval_ms),
        ))
    } else {
        None
    };

    let report = workload::run(pool, &config.workload);

    if let Some(publisher) = publisher {
        let _ = publisher.join();
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!("Load driver stopped");
    Ok(())
}
