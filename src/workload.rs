//! Synthetic producer/consumer load
//!
//! Drives a pool with concurrent producers and consumers so growth and
//! shrink can be observed end to end.

use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::WorkloadConfig;
use crate::error::PoolError;
use crate::metrics::PoolStatsSnapshot;
use crate::pool::Pool;

/// How often the driver checks whether consumers have drained the pool
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Summary of a workload run
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub producers: usize,
    pub consumers: usize,
    pub produced: u64,
    pub consumed: u64,
    pub peak_buffer_count: usize,
    pub elapsed_ms: u64,
    pub stats: PoolStatsSnapshot,
}

/// Run producers to completion, wait for consumers to drain the pool, then
/// close it
pub fn run(pool: Arc<Pool<Bytes>>, config: &WorkloadConfig) -> WorkloadReport {
    let producers = config.effective_producers();
    let consumers = config.consumers;
    let started = Instant::now();

    info!(
        producers,
        consumers,
        items_per_producer = config.items_per_producer,
        payload_bytes = config.payload_bytes,
        "Starting workload"
    );

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|id| {
            let pool = pool.clone();
            thread::spawn(move || consume(id, &pool))
        })
        .collect();

    let producer_handles: Vec<_> = (0..producers)
        .map(|id| {
            let pool = pool.clone();
            let items = config.items_per_producer;
            let payload = Bytes::from(vec![(id % 256) as u8; config.payload_bytes]);
            thread::spawn(move || produce(id, &pool, items, payload))
        })
        .collect();

    let mut produced: u64 = 0;
    let mut peak_buffer_count = pool.buffer_count();
    for handle in producer_handles {
        match handle.join() {
            Ok((count, peak)) => {
                produced += count;
                peak_buffer_count = peak_buffer_count.max(peak);
            }
            Err(_) => warn!("Producer thread panicked"),
        }
    }

    while pool.total_items() > 0 && !pool.is_closed() {
        thread::sleep(DRAIN_POLL_INTERVAL);
    }
    pool.close();

    let consumed: u64 = consumer_handles
        .into_iter()
        .filter_map(|handle| handle.join().ok())
        .sum();

    let report = WorkloadReport {
        producers,
        consumers,
        produced,
        consumed,
        peak_buffer_count,
        elapsed_ms: started.elapsed().as_millis() as u64,
        stats: pool.stats(),
    };
    info!(
        produced = report.produced,
        consumed = report.consumed,
        peak_buffer_count = report.peak_buffer_count,
        elapsed_ms = report.elapsed_ms,
        "Workload finished"
    );
    report
}

/// Returns the number of accepted items and the largest buffer count seen
fn produce(id: usize, pool: &Pool<Bytes>, items: usize, payload: Bytes) -> (u64, usize) {
    let mut accepted = 0;
    let mut peak = 0;
    for _ in 0..items {
        match pool.put(payload.clone()) {
            Ok(()) => accepted += 1,
            Err(e) => {
                debug!(producer = id, error = %e, "Producer stopped early");
                break;
            }
        }
        peak = peak.max(pool.buffer_count());
    }
    (accepted, peak)
}

fn consume(id: usize, pool: &Pool<Bytes>) -> u64 {
    let mut received = 0;
    loop {
        match pool.get() {
            Ok(_) => received += 1,
            Err(PoolError::Closed) => break,
            Err(e) => {
                warn!(consumer = id, error = %e, "Consumer stopped");
                break;
            }
        }
    }
    debug!(consumer = id, received, "Consumer finished");
    received
}
