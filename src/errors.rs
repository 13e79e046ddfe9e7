//! Error types for the keyed object pool

use thiserror::Error;

/// Boxed error produced by a fallible allocator
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Allocator failed to produce an object for key {key}")]
    AllocationFailed {
        /// Debug rendering of the key whose bucket was empty
        key: String,
        #[source]
        source: BoxError,
    },
}

impl PoolError {
    pub(crate) fn allocation_failed(key: String, source: impl Into<BoxError>) -> Self {
        Self::AllocationFailed {
            key,
            source: source.into(),
        }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
