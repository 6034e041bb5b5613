//! Lease store clients.
//!
//! A lease is the remote half of a lock: a record under a namespaced key that
//! names its owner and lapses on its own after a TTL. The store is the single
//! source of truth for who holds what across processes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::StoreConfig;

mod error;
mod in_memory;
mod store;
mod token;

#[cfg(feature = "redis")]
mod redis;

pub use error::StoreError;
pub use in_memory::{InMemoryLeaseStore, LeaseRecord};
pub use store::LeaseStore;
pub use token::{new_client_id, OwnerToken};

#[cfg(feature = "redis")]
pub use self::redis::RedisLeaseStore;

// About a century; far enough to mean "never" for a lock.
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `start + span`, saturating at a far-future instant instead of panicking.
pub(crate) fn instant_after(start: Instant, span: Duration) -> Instant {
    start
        .checked_add(span)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Build the lease store selected by configuration.
pub fn connect(config: &StoreConfig) -> Result<Arc<dyn LeaseStore>, StoreError> {
    match config {
        StoreConfig::InMemory => Ok(Arc::new(InMemoryLeaseStore::new())),
        #[cfg(feature = "redis")]
        StoreConfig::Redis { url } => Ok(Arc::new(RedisLeaseStore::connect(url)?)),
        #[cfg(not(feature = "redis"))]
        StoreConfig::Redis { .. } => Err(StoreError::Unavailable(
            "redis lease store requires the `redis` feature".into(),
        )),
    }
}
