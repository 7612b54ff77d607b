//! Fixed-capacity buffer
//!
//! A non-blocking FIFO with a checked, one-time close. Producers that race
//! a close get an error instead of a fault, and items queued before the
//! close stay drainable.

use crossbeam::queue::ArrayQueue;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{BufferError, InvalidCapacity};

/// Outcome of a successful [`Buffer::put`] call
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum PutStatus<T> {
    /// The item was queued
    Accepted,
    /// The buffer is full; the item is handed back untouched
    Full(T),
}

impl<T> PutStatus<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PutStatus::Accepted)
    }
}

/// A bounded FIFO of opaque items
pub struct Buffer<T> {
    queue: ArrayQueue<T>,
    closed: AtomicBool,
    /// Readers are in-flight puts, the writer is close
    lock: RwLock<()>,
}

impl<T> Buffer<T> {
    /// Create a new buffer holding at most `capacity` items
    pub fn new(capacity: usize) -> Result<Self, InvalidCapacity> {
        if capacity == 0 {
            return Err(InvalidCapacity);
        }
        Ok(Self {
            queue: ArrayQueue::new(capacity),
            closed: AtomicBool::new(false),
            lock: RwLock::new(()),
        })
    }

    /// Get the buffer's fixed capacity
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Get the number of queued items
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if no items are queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Enqueue without blocking.
    ///
    /// Returns [`PutStatus::Full`] with the item when there is no room, and
    /// [`BufferError::Closed`] once the buffer has been closed.
    pub fn put(&self, item: T) -> Result<PutStatus<T>, BufferError> {
        let _guard = self.lock.read();
        if self.is_closed() {
            return Err(BufferError::Closed);
        }
        match self.queue.push(item) {
            Ok(()) => Ok(PutStatus::Accepted),
            Err(item) => Ok(PutStatus::Full(item)),
        }
    }

    /// Dequeue without blocking.
    ///
    /// `Ok(None)` means empty but still open. A closed buffer keeps
    /// yielding its remaining items and reports [`BufferError::Closed`]
    /// only once drained.
    pub fn get(&self) -> Result<Option<T>, BufferError> {
        // Sampled before the pop: the flag is only set while no put is in
        // flight, so a closed buffer that pops nothing is drained for good.
        let closed = self.is_closed();
        match self.queue.pop() {
            Some(item) => Ok(Some(item)),
            None if closed => Err(BufferError::Closed),
            None => Ok(None),
        }
    }

    /// Close the buffer.
    ///
    /// Returns `true` on the open-to-closed transition and `false` if the
    /// buffer was already closed.
    pub fn close(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        let _guard = self.lock.write();
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Check if the buffer has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drop every queued item, returning how many were discarded
    pub(crate) fn discard(&self) -> usize {
        let mut discarded = 0;
        while self.queue.pop().is_some() {
            discarded += 1;
        }
        discarded
    }
}

impl<T> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
