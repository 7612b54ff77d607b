//! Atomic counters for hot-path pool metrics
//!
//! Lock-free counters owned by each pool and updated from any thread.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-pool atomic counters
#[derive(Debug, Default)]
pub struct PoolStats {
    // Traffic
    pub puts: AtomicU64,
    pub gets: AtomicU64,

    // Retry signals
    pub put_misses: AtomicU64,
    pub get_misses: AtomicU64,

    // Elasticity
    pub grows: AtomicU64,
    pub shrinks: AtomicU64,
    pub retired: AtomicU64,
    pub discarded_items: AtomicU64,
}

impl PoolStats {
    pub const fn new() -> Self {
        Self {
            puts: AtomicU64::new(0),
            gets: AtomicU64::new(0),
            put_misses: AtomicU64::new(0),
            get_misses: AtomicU64::new(0),
            grows: AtomicU64::new(0),
            shrinks: AtomicU64::new(0),
            retired: AtomicU64::new(0),
            discarded_items: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn put_miss(&self) {
        self.put_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn get_miss(&self) {
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn grow(&self) {
        self.grows.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn shrink(&self) {
        self.shrinks.fetch_add(1, Ordering::Relaxed);
    }

    /// A buffer left the pool because of closure
    #[inline]
    pub fn retire(&self, discarded: u64) {
        self.retired.fetch_add(1, Ordering::Relaxed);
        self.discarded_items.fetch_add(discarded, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            puts: self.puts.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            put_misses: self.put_misses.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            grows: self.grows.load(Ordering::Relaxed),
            shrinks: self.shrinks.load(Ordering::Relaxed),
            retired: self.retired.load(Ordering::Relaxed),
            discarded_items: self.discarded_items.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool counters for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatsSnapshot {
    pub puts: u64,
    pub gets: u64,
    pub put_misses: u64,
    pub get_misses: u64,
    pub grows: u64,
    pub shrinks: u64,
    pub retired: u64,
    pub discarded_items: u64,
}
