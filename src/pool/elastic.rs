//! Elastic buffer pool
//!
//! A blocking FIFO made of a bounded, self-resizing set of [`Buffer`]s.
//! Sustained put contention adds buffers up to the configured maximum and
//! sustained get starvation closes idle ones down to a single buffer.
//!
//! Ordering is FIFO per buffer only; items that land in different buffers
//! come out in no particular relative order.

use crossbeam::utils::Backoff;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::activity::Activity;
use super::buffer::{Buffer, PutStatus};
use super::rotation::Rotation;
use crate::config::PoolConfig;
use crate::error::{BufferError, InvalidCapacity, PoolError};
use crate::metrics::{PoolStats, PoolStatsSnapshot};

/// Put misses per buffer tolerated before the pool grows
pub const PUT_MISS_FACTOR: usize = 5;
/// Get misses per buffer tolerated before the pool shrinks
pub const GET_MISS_FACTOR: usize = 10;
/// Longest a caller parks between attempts once its backoff is exhausted
const PARK_INTERVAL: Duration = Duration::from_millis(1);

/// Result of a growth attempt
enum Grow<T> {
    Grown,
    /// Already at the ceiling; the item is handed back
    AtMax(T),
    Closed,
}

/// Elastic blocking queue of buffers
pub struct Pool<T> {
    buffer_capacity: usize,
    max_buffer_count: usize,
    buffer_count: AtomicUsize,
    total: AtomicU64,
    rotation: Rotation<T>,
    closed: AtomicBool,
    /// Serializes growth, shrink and close
    resize: Mutex<()>,
    /// Wakes parked callers when an item or a free slot appears
    activity: Activity,
    stats: PoolStats,
}

impl<T> Pool<T> {
    /// Create a pool with one pre-allocated buffer
    pub fn new(buffer_capacity: usize, max_buffer_count: usize) -> Result<Self, PoolError> {
        if buffer_capacity == 0 {
            return Err(PoolError::InvalidConfig {
                message: "buffer_capacity must be > 0",
            });
        }
        if max_buffer_count == 0 {
            return Err(PoolError::InvalidConfig {
                message: "max_buffer_count must be > 0",
            });
        }

        let rotation = Rotation::new(max_buffer_count);
        rotation
            .give_back(new_buffer(buffer_capacity)?)
            .map_err(|_| PoolError::Closed)?;

        Ok(Self {
            buffer_capacity,
            max_buffer_count,
            buffer_count: AtomicUsize::new(1),
            total: AtomicU64::new(0),
            rotation,
            closed: AtomicBool::new(false),
            resize: Mutex::new(()),
            activity: Activity::new(),
            stats: PoolStats::new(),
        })
    }

    /// Create a pool from configuration
    pub fn with_config(config: &PoolConfig) -> Result<Self, PoolError> {
        Self::new(config.buffer_capacity, config.max_buffer_count)
    }

    /// Get the capacity of each buffer
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Get the ceiling on the buffer count
    pub fn max_buffer_count(&self) -> usize {
        self.max_buffer_count
    }

    /// Get the current buffer count
    pub fn buffer_count(&self) -> usize {
        self.buffer_count.load(Ordering::Acquire)
    }

    /// Get the number of queued items across all buffers
    pub fn total_items(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Get a snapshot of the pool counters
    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// Put an item, blocking until some buffer accepts it.
    ///
    /// Fails with [`PoolError::Closed`] if the pool is closed before or
    /// while waiting; the item is dropped in that case.
    pub fn put(&self, item: T) -> Result<(), PoolError> {
        self.put_until(item, None)
    }

    /// Like [`put`](Self::put), giving up with [`PoolError::Timeout`]
    /// after `timeout`
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PoolError> {
        self.put_until(item, Some(Instant::now() + timeout))
    }

    /// Get an item, blocking until one is available.
    ///
    /// Fails with [`PoolError::Closed`] if the pool is closed before or
    /// while waiting.
    pub fn get(&self) -> Result<T, PoolError> {
        self.get_until(None)
    }

    /// Like [`get`](Self::get), giving up with [`PoolError::Timeout`]
    /// after `timeout`
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, PoolError> {
        self.get_until(Some(Instant::now() + timeout))
    }

    /// Close the pool and every buffer it owns.
    ///
    /// Returns `false` if the pool was already closed. Items still queued
    /// are discarded.
    pub fn close(&self) -> bool {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let _guard = self.resize.lock();
        let idle = self.rotation.close();
        let idle_count = idle.len();
        for buffer in idle {
            self.retire(buffer);
        }
        self.activity.notify();

        info!(
            closed_buffers = idle_count,
            in_flight = self.buffer_count(),
            "Pool closed"
        );
        true
    }

    /// Check if the pool has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn put_until(&self, item: T, deadline: Option<Instant>) -> Result<(), PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let threshold = self.buffer_count().max(1) * PUT_MISS_FACTOR;
        let backoff = Backoff::new();
        let mut misses = 0;
        let mut item = item;

        loop {
            check_deadline(deadline)?;
            let seen = self.activity.generation();
            let buffer = self.rotation.take(deadline)?;

            match buffer.put(item) {
                Ok(PutStatus::Accepted) => {
                    self.total.fetch_add(1, Ordering::AcqRel);
                    self.stats.put();
                    self.activity.notify();
                    // Accepted before closure; a failed give-back retires
                    // the buffer and counts the item as discarded.
                    let _ = self.restore(buffer);
                    return Ok(());
                }
                Ok(PutStatus::Full(rejected)) => {
                    item = rejected;
                    misses += 1;
                    self.stats.put_miss();
                    self.restore(buffer)?;

                    if misses >= threshold {
                        misses = 0;
                        match self.grow(item) {
                            Grow::Grown => return Ok(()),
                            Grow::AtMax(rejected) => item = rejected,
                            Grow::Closed => return Err(PoolError::Closed),
                        }
                    }
                    self.pause(&backoff, seen, deadline);
                }
                Err(BufferError::Closed) => {
                    self.retire(buffer);
                    return Err(PoolError::Closed);
                }
            }
        }
    }

    fn get_until(&self, deadline: Option<Instant>) -> Result<T, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let threshold = self.buffer_count().max(1) * GET_MISS_FACTOR;
        let backoff = Backoff::new();
        let mut misses = 0;

        loop {
            check_deadline(deadline)?;
            let seen = self.activity.generation();
            let buffer = self.rotation.take(deadline)?;

            match buffer.get() {
                Ok(Some(item)) => {
                    self.total.fetch_sub(1, Ordering::AcqRel);
                    self.stats.get();
                    self.activity.notify();
                    let _ = self.restore(buffer);
                    return Ok(item);
                }
                Ok(None) => {
                    self.handle_get_miss(buffer, &mut misses, threshold)?;
                    self.pause(&backoff, seen, deadline);
                }
                Err(BufferError::Closed) => {
                    self.retire(buffer);
                    return Err(PoolError::Closed);
                }
            }
        }
    }

    /// Count a miss on an empty buffer and shrink once the streak is long
    /// enough. The streak only restarts after an actual shrink.
    fn handle_get_miss(
        &self,
        buffer: Buffer<T>,
        misses: &mut usize,
        threshold: usize,
    ) -> Result<(), PoolError> {
        *misses += 1;
        self.stats.get_miss();

        if *misses < threshold {
            return self.restore(buffer);
        }
        match self.shrink(buffer) {
            Some(buffer) => self.restore(buffer),
            None => {
                *misses = 0;
                Ok(())
            }
        }
    }

    /// Snooze while the backoff lasts, then park until another caller makes
    /// progress
    fn pause(&self, backoff: &Backoff, seen: u64, deadline: Option<Instant>) {
        if !backoff.is_completed() {
            backoff.snooze();
            return;
        }
        let until = Instant::now() + PARK_INTERVAL;
        let until = match deadline {
            Some(deadline) => until.min(deadline),
            None => until,
        };
        self.activity.wait(seen, until);
    }

    /// Add a buffer seeded with `item`, unless at the ceiling or closed
    fn grow(&self, item: T) -> Grow<T> {
        if self.buffer_count() >= self.max_buffer_count {
            return Grow::AtMax(item);
        }

        let _guard = self.resize.lock();
        if self.is_closed() {
            return Grow::Closed;
        }
        let count = self.buffer_count();
        if count >= self.max_buffer_count {
            return Grow::AtMax(item);
        }

        let buffer = match new_buffer(self.buffer_capacity) {
            Ok(buffer) => buffer,
            Err(_) => return Grow::AtMax(item),
        };
        match buffer.put(item) {
            Ok(PutStatus::Accepted) => {}
            Ok(PutStatus::Full(item)) => return Grow::AtMax(item),
            Err(_) => return Grow::Closed,
        }

        self.buffer_count.fetch_add(1, Ordering::AcqRel);
        self.total.fetch_add(1, Ordering::AcqRel);
        self.stats.put();
        self.activity.notify();
        // The seeded item counts as accepted even if closure discards it
        let _ = self.restore(buffer);

        self.stats.grow();
        debug!(
            buffer_count = count + 1,
            max_buffer_count = self.max_buffer_count,
            "Pool grew"
        );
        Grow::Grown
    }

    /// Close `buffer` if it is empty and not the last one.
    ///
    /// Hands the buffer back when it has to stay in rotation.
    fn shrink(&self, buffer: Buffer<T>) -> Option<Buffer<T>> {
        if !buffer.is_empty() || self.buffer_count() <= 1 {
            return Some(buffer);
        }

        let _guard = self.resize.lock();
        let count = self.buffer_count();
        if self.is_closed() || count <= 1 {
            return Some(buffer);
        }

        buffer.close();
        self.buffer_count.fetch_sub(1, Ordering::AcqRel);
        self.stats.shrink();
        debug!(buffer_count = count - 1, "Pool shrank");
        None
    }

    /// Return `buffer` to rotation, retiring it if the pool closed meanwhile
    fn restore(&self, buffer: Buffer<T>) -> Result<(), PoolError> {
        self.rotation.give_back(buffer).map_err(|buffer| {
            self.retire(buffer);
            PoolError::Closed
        })
    }

    /// Drop a buffer from the pool after closure along with its items
    fn retire(&self, buffer: Buffer<T>) {
        buffer.close();
        let discarded = buffer.discard() as u64;
        if discarded > 0 {
            self.total.fetch_sub(discarded, Ordering::AcqRel);
        }
        self.buffer_count.fetch_sub(1, Ordering::AcqRel);
        self.stats.retire(discarded);
        trace!(discarded, "Retired buffer");
    }
}

fn new_buffer<T>(capacity: usize) -> Result<Buffer<T>, PoolError> {
    Buffer::new(capacity).map_err(|InvalidCapacity| PoolError::InvalidConfig {
        message: "buffer_capacity must be > 0",
    })
}

fn check_deadline(deadline: Option<Instant>) -> Result<(), PoolError> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(PoolError::Timeout),
        _ => Ok(()),
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("buffer_capacity", &self.buffer_capacity)
            .field("max_buffer_count", &self.max_buffer_count)
            .field("buffer_count", &self.buffer_count())
            .field("idle_buffers", &self.rotation.idle_count())
            .field("total_items", &self.total_items())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_pool_invalid_config() {
        assert!(matches!(
            Pool::<u32>::new(0, 3),
            Err(PoolError::InvalidConfig { .. })
        ));
        assert!(matches!(
            Pool::<u32>::new(3, 0),
            Err(PoolError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_pool_initial_state() {
        let pool = Pool::<u32>::with_config(&PoolConfig {
            buffer_capacity: 4,
            max_buffer_count: 2,
        })
        .unwrap();

        assert_eq!(pool.buffer_capacity(), 4);
        assert_eq!(pool.max_buffer_count(), 2);
        assert_eq!(pool.buffer_count(), 1);
        assert_eq!(pool.total_items(), 0);
        assert!(!pool.is_closed());
    }

    #[test]
    fn test_pool_put_get_single_buffer() {
        let pool = Pool::new(4, 1).unwrap();
        for i in 0..4 {
            pool.put(i).unwrap();
        }
        assert_eq!(pool.total_items(), 4);

        // One buffer means plain FIFO
        for i in 0..4 {
            assert_eq!(pool.get().unwrap(), i);
        }
        assert_eq!(pool.total_items(), 0);
    }

    #[test]
    fn test_pool_closed() {
        let pool = Pool::new(1, 1).unwrap();
        assert!(pool.close());

        assert_eq!(pool.put(1), Err(PoolError::Closed));
        assert_eq!(pool.get(), Err(PoolError::Closed));
        assert!(!pool.close());
        assert!(pool.is_closed());
    }

    #[test]
    fn test_pool_close_discards_items() {
        let pool = Pool::new(4, 1).unwrap();
        pool.put("a").unwrap();
        pool.put("b").unwrap();

        assert!(pool.close());
        assert_eq!(pool.total_items(), 0);
        assert_eq!(pool.buffer_count(), 0);
        assert_eq!(pool.stats().discarded_items, 2);
    }

    #[test]
    fn test_pool_grows_to_max() {
        let pool = Pool::new(1, 3).unwrap();

        // Each extra put misses on full buffers until it seeds a new one
        for i in 0..3 {
            pool.put(i).unwrap();
            assert_eq!(pool.buffer_count(), i + 1);
        }

        assert_eq!(
            pool.put_timeout(3, Duration::from_millis(50)),
            Err(PoolError::Timeout)
        );
        assert_eq!(pool.buffer_count(), 3);
        assert_eq!(pool.total_items(), 3);
        assert_eq!(pool.stats().grows, 2);
    }

    #[test]
    fn test_pool_shrinks_to_one() {
        let pool = Pool::new(1, 3).unwrap();
        for i in 0..3 {
            pool.put(i).unwrap();
        }
        for _ in 0..3 {
            pool.get().unwrap();
        }
        assert_eq!(pool.buffer_count(), 3);

        for _ in 0..50 {
            if pool.buffer_count() == 1 {
                break;
            }
            assert_eq!(
                pool.get_timeout(Duration::from_millis(200)),
                Err(PoolError::Timeout)
            );
        }
        assert_eq!(pool.buffer_count(), 1);

        // The last buffer is never removed
        let _ = pool.get_timeout(Duration::from_millis(50));
        assert_eq!(pool.buffer_count(), 1);
        assert_eq!(pool.stats().shrinks, 2);
    }

    #[test]
    fn test_declined_shrink_keeps_miss_streak() {
        let pool = Pool::<u32>::new(1, 2).unwrap();
        let threshold = GET_MISS_FACTOR;
        let mut misses = threshold;

        // At the floor the shrink is declined and the streak survives
        let buffer = pool.rotation.take(None).unwrap();
        pool.handle_get_miss(buffer, &mut misses, threshold).unwrap();
        assert_eq!(misses, threshold + 1);
        assert_eq!(pool.buffer_count(), 1);

        // Grow to two buffers, then empty them again
        pool.put(1).unwrap();
        pool.put(2).unwrap();
        assert_eq!(pool.buffer_count(), 2);
        pool.get().unwrap();
        pool.get().unwrap();

        // The very next miss shrinks
        let buffer = pool.rotation.take(None).unwrap();
        pool.handle_get_miss(buffer, &mut misses, threshold).unwrap();
        assert_eq!(misses, 0);
        assert_eq!(pool.buffer_count(), 1);
        assert_eq!(pool.stats().shrinks, 1);
    }

    #[test]
    fn test_blocked_get_parks() {
        let pool = Arc::new(Pool::<u32>::new(4, 4).unwrap());

        let getter = {
            let pool = pool.clone();
            thread::spawn(move || pool.get())
        };

        thread::sleep(Duration::from_millis(200));
        let misses = pool.stats().get_misses;
        pool.put(5).unwrap();

        assert_eq!(getter.join().unwrap(), Ok(5));
        // Roughly one attempt per park interval, not a hot loop
        assert!(misses < 10_000, "get_misses while blocked: {misses}");
    }

    #[test]
    fn test_blocked_put_at_max_parks() {
        let pool = Arc::new(Pool::<u32>::new(1, 1).unwrap());
        pool.put(0).unwrap();

        let putter = {
            let pool = pool.clone();
            thread::spawn(move || pool.put(1))
        };

        thread::sleep(Duration::from_millis(200));
        let misses = pool.stats().put_misses;
        assert_eq!(pool.get().unwrap(), 0);

        assert_eq!(putter.join().unwrap(), Ok(()));
        assert_eq!(pool.get().unwrap(), 1);
        assert!(misses < 10_000, "put_misses while blocked: {misses}");
    }
}
