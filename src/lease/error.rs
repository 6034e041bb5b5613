use thiserror::Error;

/// Error returned by a [`LeaseStore`](super::LeaseStore) round trip.
///
/// A store error means the outcome of the operation is unknown: the lease may
/// or may not have been written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached or failed mid-request.
    #[error("lease store unavailable: {0}")]
    Unavailable(String),
    /// The store answered with something the client does not understand.
    #[error("unexpected lease store reply: {0}")]
    UnexpectedReply(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(format!("redis: {}", err))
    }
}
