//! Pool of serialized items
//!
//! Stores items as JSON-encoded [`Bytes`] so payloads of any serde type can
//! share one elastic pool and be handed to byte-oriented sinks unchanged.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;

use super::elastic::Pool;
use crate::error::PoolError;

/// Errors returned by an [`EncodedPool`]
#[derive(Debug, Error)]
pub enum EncodedPoolError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("failed to encode item: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode item: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Elastic pool whose items are serialized on the way in
pub struct EncodedPool<T> {
    inner: Pool<Bytes>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> EncodedPool<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(buffer_capacity: usize, max_buffer_count: usize) -> Result<Self, PoolError> {
        Ok(Self {
            inner: Pool::new(buffer_capacity, max_buffer_count)?,
            _marker: PhantomData,
        })
    }

    /// Encode and put an item, blocking like [`Pool::put`]
    pub fn put(&self, item: &T) -> Result<(), EncodedPoolError> {
        let payload = Self::encode(item)?;
        Ok(self.inner.put(payload)?)
    }

    pub fn put_timeout(&self, item: &T, timeout: Duration) -> Result<(), EncodedPoolError> {
        let payload = Self::encode(item)?;
        Ok(self.inner.put_timeout(payload, timeout)?)
    }

    /// Get and decode an item, blocking like [`Pool::get`].
    ///
    /// A payload that fails to decode is consumed, not requeued.
    pub fn get(&self) -> Result<T, EncodedPoolError> {
        let payload = self.inner.get()?;
        Self::decode(&payload)
    }

    pub fn get_timeout(&self, timeout: Duration) -> Result<T, EncodedPoolError> {
        let payload = self.inner.get_timeout(timeout)?;
        Self::decode(&payload)
    }

    /// Get the number of queued items
    pub fn total_items(&self) -> u64 {
        self.inner.total_items()
    }

    pub fn close(&self) -> bool {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Access the underlying byte pool
    pub fn inner(&self) -> &Pool<Bytes> {
        &self.inner
    }

    fn encode(item: &T) -> Result<Bytes, EncodedPoolError> {
        serde_json::to_vec(item)
            .map(Bytes::from)
            .map_err(EncodedPoolError::Encode)
    }

    fn decode(payload: &[u8]) -> Result<T, EncodedPoolError> {
        serde_json::from_slice(payload).map_err(EncodedPoolError::Decode)
    }
}
