use std::time::Duration;

use super::LockError;

/// Result of a timed acquire that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The lease was written; the caller now holds the lock.
    Acquired,
    /// The timeout elapsed while someone else held the lock.
    TimedOut,
}

impl AcquireOutcome {
    pub fn is_acquired(self) -> bool {
        self == AcquireOutcome::Acquired
    }
}

/// Trait for a single lock instance.
///
/// Acquisition is always bounded by a timeout; contention ends in
/// `Ok(AcquireOutcome::TimedOut)`, never in an error. An `Err` means the
/// lock state is unknown and must not be treated as granted.
pub trait Lock: Send + Sync {
    /// Try to acquire the lock, blocking for at most `timeout`.
    fn try_acquire(&self, timeout: Duration) -> Result<AcquireOutcome, LockError>;

    /// Release the lock held by the calling thread. Local state is cleared
    /// even if a store error is returned; the error only reports that the
    /// remote lease may linger or was lost. A caller that does not hold the
    /// lock gets `NotHeld` while someone else holds it, `Ok(())` otherwise.
    fn release(&self) -> Result<(), LockError>;

    /// Whether this lock is held from the local point of view.
    fn is_locked(&self) -> bool;
}
