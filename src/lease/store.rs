use std::sync::Arc;
use std::time::Duration;

use super::{OwnerToken, StoreError};

/// Client for the shared key-value store that holds lease records.
///
/// Each method must be a single atomic operation on the store. There is no
/// read-then-write on the client side: the store itself decides whether a
/// record is absent, or whether the presented token matches the owner.
/// In-memory stores implement this over a `HashMap`; distributed stores use
/// Redis `SET NX PX` plus compare-and-delete scripts, etc.
pub trait LeaseStore: Send + Sync {
    /// Create the lease record for `key` if none exists (expired records count
    /// as absent). Returns `Ok(true)` if this call created it.
    fn try_create_lease(
        &self,
        key: &str,
        owner: &OwnerToken,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Extend the lease to `now + ttl` if `owner` still owns it.
    /// Returns `Ok(false)` if the lease expired or was taken by someone else.
    fn renew_lease(&self, key: &str, owner: &OwnerToken, ttl: Duration)
        -> Result<bool, StoreError>;

    /// Delete the lease if `owner` still owns it.
    /// Returns `Ok(false)` if there was nothing of ours to delete.
    fn release_lease(&self, key: &str, owner: &OwnerToken) -> Result<bool, StoreError>;
}

impl<S: LeaseStore + ?Sized> LeaseStore for Arc<S> {
    fn try_create_lease(
        &self,
        key: &str,
        owner: &OwnerToken,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        (**self).try_create_lease(key, owner, ttl)
    }

    fn renew_lease(
        &self,
        key: &str,
        owner: &OwnerToken,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        (**self).renew_lease(key, owner, ttl)
    }

    fn release_lease(&self, key: &str, owner: &OwnerToken) -> Result<bool, StoreError> {
        (**self).release_lease(key, owner)
    }
}
