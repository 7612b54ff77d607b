//! Elastic Pool - self-resizing blocking queue
//!
//! This library provides a blocking FIFO built from a bounded set of
//! fixed-capacity buffers that grows under put contention and shrinks
//! under get starvation.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod util;
pub mod workload;

pub use config::{Config, PoolConfig};
pub use error::{BufferError, InvalidCapacity, PoolError};
pub use pool::{Buffer, EncodedPool, Pool, PutStatus};

/// Crate version for display
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
