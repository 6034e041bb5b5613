use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::lease::LeaseStore;

use super::{AcquireOutcome, Lock, LockError, LockHandle};

/// Scoped hold on a lock: released when dropped.
///
/// `release` consumes the guard and reports the remote outcome; dropping it
/// releases too but can only log a failure.
///
/// Like `std::sync::MutexGuard` it is `!Send`: a hold is released by the
/// thread that acquired it.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<L: Lock> {
    lock: Arc<L>,
    released: bool,
    _not_send: PhantomData<*const ()>,
}

impl<L: Lock> LockGuard<L> {
    /// Acquire `lock`, waiting at most `timeout`. `Ok(None)` means timed out.
    pub fn acquire(lock: Arc<L>, timeout: Duration) -> Result<Option<Self>, LockError> {
        match lock.try_acquire(timeout)? {
            AcquireOutcome::Acquired => Ok(Some(LockGuard {
                lock,
                released: false,
                _not_send: PhantomData,
            })),
            AcquireOutcome::TimedOut => Ok(None),
        }
    }

    pub fn lock(&self) -> &Arc<L> {
        &self.lock
    }

    /// Release now and surface any remote failure.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.lock.release()
    }
}

impl<S: LeaseStore> LockGuard<LockHandle<S>> {
    /// Extend the held lease by the configured TTL.
    pub fn renew(&self) -> Result<(), LockError> {
        self.lock.renew()
    }
}

impl<L: Lock> Drop for LockGuard<L> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.lock.release() {
            warn!(error = %err, "release on guard drop failed");
        }
    }
}
