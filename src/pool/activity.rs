//! Pool activity signal
//!
//! Lets callers that keep missing park until another caller makes progress
//! instead of yielding in a loop. A generation counter closes the window
//! between a miss and the wait, so a notification sent in between is never
//! lost.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

pub(crate) struct Activity {
    generation: AtomicU64,
    waiters: AtomicUsize,
    lock: Mutex<()>,
    changed: Condvar,
}

impl Activity {
    pub(crate) fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            waiters: AtomicUsize::new(0),
            lock: Mutex::new(()),
            changed: Condvar::new(),
        }
    }

    /// Sample the generation before an attempt
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Record progress and wake parked callers
    pub(crate) fn notify(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) > 0 {
            let _guard = self.lock.lock();
            self.changed.notify_all();
        }
    }

    /// Park until the generation moves past `seen` or `until` passes
    pub(crate) fn wait(&self, seen: u64, until: Instant) {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.lock.lock();
        if self.generation.load(Ordering::SeqCst) == seen {
            let _ = self.changed.wait_until(&mut guard, until);
        }
        drop(guard);
        self.waiters.fetch_sub(1, Ordering::SeqCst);
    }
}
