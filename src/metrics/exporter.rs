//! Prometheus metrics exporter
//!
//! HTTP endpoint for Prometheus scraping, fed by a background thread that
//! pushes pool counters into the `metrics` facade.

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::counters::PoolStatsSnapshot;
use crate::config::MetricsConfig;
use crate::pool::Pool;

/// Install the Prometheus exporter and register metric descriptions
pub fn init_metrics(config: &MetricsConfig) -> Result<()> {
    describe_metrics();

    PrometheusBuilder::new()
        .with_http_listener(config.bind_addr)
        .install()?;

    Ok(())
}

/// Register metric descriptions
pub fn describe_metrics() {
    describe_counter!("elastic_pool_puts_total", "Items accepted by the pool");
    describe_counter!("elastic_pool_gets_total", "Items returned by the pool");
    describe_counter!("elastic_pool_put_misses_total", "Put attempts that hit a full buffer");
    describe_counter!("elastic_pool_get_misses_total", "Get attempts that hit an empty buffer");
    describe_counter!("elastic_pool_grows_total", "Buffers added under put contention");
    describe_counter!("elastic_pool_shrinks_total", "Buffers removed under get starvation");
    describe_counter!("elastic_pool_discarded_items_total", "Items dropped by closure");
    describe_gauge!("elastic_pool_buffers", "Current buffer count");
    describe_gauge!("elastic_pool_items", "Items currently queued");
}

/// Push the deltas between two snapshots plus the current gauges
pub fn publish(
    last: &PoolStatsSnapshot,
    snapshot: &PoolStatsSnapshot,
    buffer_count: usize,
    total_items: u64,
) {
    let deltas = [
        ("elastic_pool_puts_total", snapshot.puts, last.puts),
        ("elastic_pool_gets_total", snapshot.gets, last.gets),
        ("elastic_pool_put_misses_total", snapshot.put_misses, last.put_misses),
        ("elastic_pool_get_misses_total", snapshot.get_misses, last.get_misses),
        ("elastic_pool_grows_total", snapshot.grows, last.grows),
        ("elastic_pool_shrinks_total", snapshot.shrinks, last.shrinks),
        (
            "elastic_pool_discarded_items_total",
            snapshot.discarded_items,
            last.discarded_items,
        ),
    ];
    for (name, current, previous) in deltas {
        let delta = current.saturating_sub(previous);
        if delta > 0 {
            counter!(name).increment(delta);
        }
    }

    gauge!("elastic_pool_buffers").set(buffer_count as f64);
    gauge!("elastic_pool_items").set(total_items as f64);
}

/// Spawn a thread that publishes `pool` stats every `interval` until the
/// pool closes
pub fn spawn_publisher<T>(pool: Arc<Pool<T>>, interval: Duration) -> JoinHandle<()>
where
    T: Send + 'static,
{
    thread::spawn(move || {
        let mut last = PoolStatsSnapshot::default();

        loop {
            let snapshot = pool.stats();
            publish(&last, &snapshot, pool.buffer_count(), pool.total_items());
            last = snapshot;

            if pool.is_closed() {
                break;
            }
            thread::sleep(interval);
        }
        tracing::debug!("Metrics publisher stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_stops_on_close() {
        // No recorder installed; the facade calls are no-ops
        let pool = Arc::new(Pool::<u32>::new(2, 2).unwrap());
        pool.put(1).unwrap();

        let handle = spawn_publisher(pool.clone(), Duration::from_millis(5));
        pool.close();
        handle.join().unwrap();
    }
}
