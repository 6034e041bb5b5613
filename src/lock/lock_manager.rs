use std::sync::Arc;

use super::{Lock, LockError};

/// Factory trait for obtaining per-key locks.
///
/// Request handlers use a `LockManager` to obtain the lock for a resource key,
/// acquire it with a bounded wait, and release it when done. The default
/// implementation is [`LockRegistry`](crate::LockRegistry), which backs every
/// lock with a lease in a shared store.
pub trait LockManager: Send + Sync {
    /// The concrete lock type returned by this manager.
    type Lock: Lock;

    /// Get (or create) the lock for the given key.
    ///
    /// Repeated calls with the same `key` return the same `Arc` for as long as
    /// anyone still holds a reference to it.
    fn obtain(&self, key: &str) -> Result<Arc<Self::Lock>, LockError>;
}
