//! Elastic buffer pool
//!
//! Fixed-capacity buffers combined into a blocking queue that resizes
//! itself under contention.

mod activity;
mod buffer;
mod elastic;
mod encoded;
mod rotation;

pub use buffer::{Buffer, PutStatus};
pub use elastic::{Pool, GET_MISS_FACTOR, PUT_MISS_FACTOR};
pub use encoded::{EncodedPool, EncodedPoolError};
