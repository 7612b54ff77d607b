//! Error types
//!
//! Full and empty buffers are retry signals, not errors, so they never
//! appear here.

use thiserror::Error;

/// Errors returned by a single [`Buffer`](crate::pool::Buffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The buffer was closed (and, for `get`, fully drained)
    #[error("closed buffer")]
    Closed,
}

/// A buffer cannot be created with zero capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid buffer capacity: must be > 0")]
pub struct InvalidCapacity;

/// Errors returned by a [`Pool`](crate::pool::Pool)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Rejected construction parameters
    #[error("invalid pool configuration: {message}")]
    InvalidConfig {
        /// What was wrong
        message: &'static str,
    },
    /// The pool was closed before or during the operation
    #[error("closed pool")]
    Closed,
    /// A bounded `put_timeout`/`get_timeout` ran out of time
    #[error("pool operation timed out")]
    Timeout,
}

impl PoolError {
    /// Check whether the error is caused by pool closure
    pub fn is_closed(&self) -> bool {
        matches!(self, PoolError::Closed)
    }
}
