use thiserror::Error;

use crate::lease::StoreError;

/// Error type for lock operations.
///
/// Timing out is not an error: see [`AcquireOutcome::TimedOut`](super::AcquireOutcome).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The lease store could not be reached; whether the lock is held is unknown.
    #[error("lease store unavailable for lock {key}: {source}")]
    StoreUnavailable {
        key: String,
        #[source]
        source: StoreError,
    },
    /// The lease expired or changed owner while we believed we held it.
    #[error("lease for lock {key} was lost before it was renewed or released")]
    LostLease { key: String },
    /// Renewal requested on a lock that is not held.
    #[error("lock {key} is not held")]
    NotHeld { key: String },
    /// A local std lock was poisoned (a thread panicked while holding it).
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl LockError {
    pub(crate) fn store(key: &str, source: StoreError) -> Self {
        LockError::StoreUnavailable {
            key: key.to_string(),
            source,
        }
    }

    /// True when the caller can no longer assume exclusivity it thought it had.
    pub fn is_lost_lease(&self) -> bool {
        matches!(self, LockError::LostLease { .. })
    }
}
