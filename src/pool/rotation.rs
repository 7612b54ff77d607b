//! Buffer rotation
//!
//! Ready-queue of idle buffers. A caller takes one buffer out, works on it
//! privately and gives it back, so no two pool operations ever touch the
//! same buffer at once.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Instant;

use super::buffer::Buffer;
use crate::error::PoolError;

struct RotationState<T> {
    idle: VecDeque<Buffer<T>>,
    closed: bool,
}

pub(crate) struct Rotation<T> {
    state: Mutex<RotationState<T>>,
    ready: Condvar,
}

impl<T> Rotation<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RotationState {
                idle: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Take the next idle buffer, waiting while every buffer is checked out.
    ///
    /// Fails with `Closed` once the rotation is closed, or `Timeout` when
    /// `deadline` passes first.
    pub(crate) fn take(&self, deadline: Option<Instant>) -> Result<Buffer<T>, PoolError> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PoolError::Closed);
            }
            if let Some(buffer) = state.idle.pop_front() {
                return Ok(buffer);
            }
            match deadline {
                None => self.ready.wait(&mut state),
                Some(deadline) => {
                    if self.ready.wait_until(&mut state, deadline).timed_out() {
                        if state.closed {
                            return Err(PoolError::Closed);
                        }
                        return state.idle.pop_front().ok_or(PoolError::Timeout);
                    }
                }
            }
        }
    }

    /// Return a buffer to the back of the rotation.
    ///
    /// A closed rotation refuses the buffer and hands it back.
    pub(crate) fn give_back(&self, buffer: Buffer<T>) -> Result<(), Buffer<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(buffer);
        }
        state.idle.push_back(buffer);
        drop(state);
        self.ready.notify_one();
        Ok(())
    }

    /// Close the rotation, wake every waiter and return the idle buffers
    pub(crate) fn close(&self) -> Vec<Buffer<T>> {
        let mut state = self.state.lock();
        state.closed = true;
        let idle = state.idle.drain(..).collect();
        drop(state);
        self.ready.notify_all();
        idle
    }

    pub(crate) fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn buffer(capacity: usize) -> Buffer<u32> {
        Buffer::new(capacity).unwrap()
    }

    #[test]
    fn test_rotation_round_robin() {
        let rotation = Rotation::new(2);
        rotation.give_back(buffer(1)).unwrap();
        rotation.give_back(buffer(2)).unwrap();

        let first = rotation.take(None).unwrap();
        assert_eq!(first.capacity(), 1);
        rotation.give_back(first).unwrap();

        // The returned buffer goes to the back
        assert_eq!(rotation.take(None).unwrap().capacity(), 2);
        assert_eq!(rotation.idle_count(), 1);
    }

    #[test]
    fn test_rotation_timeout() {
        let rotation = Rotation::<u32>::new(1);
        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(rotation.take(Some(deadline)).unwrap_err(), PoolError::Timeout);
    }

    #[test]
    fn test_rotation_close_wakes_waiter() {
        let rotation = Arc::new(Rotation::<u32>::new(1));

        let waiter = {
            let rotation = rotation.clone();
            thread::spawn(move || rotation.take(None).map(|_| ()))
        };

        thread::sleep(Duration::from_millis(20));
        assert!(rotation.close().is_empty());
        assert_eq!(waiter.join().unwrap(), Err(PoolError::Closed));
    }

    #[test]
    fn test_rotation_refuses_after_close() {
        let rotation = Rotation::new(1);
        rotation.give_back(buffer(1)).unwrap();

        let idle = rotation.close();
        assert_eq!(idle.len(), 1);
        assert!(rotation.give_back(buffer(1)).is_err());
        assert_eq!(rotation.take(None).unwrap_err(), PoolError::Closed);
    }
}
