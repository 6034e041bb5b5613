use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::LockRegistryConfig;
use crate::events::{LockEvent, LockEvents, LOCK_ACQUIRED, LOCK_RELEASED};
use crate::lease::{instant_after, LeaseStore, OwnerToken};

use super::{AcquireOutcome, Lock, LockError};

/// Lease timing used by a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseSettings {
    pub lease_ttl: Duration,
    pub poll_interval_min: Duration,
    pub poll_interval_max: Duration,
}

impl From<&LockRegistryConfig> for LeaseSettings {
    fn from(config: &LockRegistryConfig) -> Self {
        LeaseSettings {
            lease_ttl: config.lease_ttl(),
            poll_interval_min: config.poll_interval_min(),
            poll_interval_max: config.poll_interval_max(),
        }
    }
}

#[derive(Debug, Default)]
struct HandleState {
    /// A local thread is acquiring or holds the lock.
    claimed: bool,
    /// The thread that claimed the gate.
    holder: Option<ThreadId>,
    owner: Option<OwnerToken>,
    expires_at: Option<Instant>,
    last_acquired: Option<Instant>,
}

impl HandleState {
    fn is_locked(&self, now: Instant) -> bool {
        self.owner.is_some() && self.expires_at.is_some_and(|at| now < at)
    }

    fn held_by_current_thread(&self) -> bool {
        self.owner.is_some() && self.holder == Some(thread::current().id())
    }
}

/// Exclusive lock on one resource key, backed by a lease in a [`LeaseStore`].
///
/// Threads of this process queue on a local `Mutex` + `Condvar` gate first;
/// only the thread that passes the gate talks to the store. The gate stays
/// claimed from the start of a successful acquire until `release`, so a second
/// local caller waits locally instead of hammering the store.
///
/// Not reentrant: acquiring twice without releasing waits for (and times out
/// against) the first acquisition.
///
/// A hold belongs to the thread whose `try_acquire` succeeded. `release` and
/// `renew` from any other thread fail with [`LockError::NotHeld`] and leave
/// the holder's lease alone.
pub struct LockHandle<S: LeaseStore> {
    key: String,
    lease_key: String,
    client_id: Arc<str>,
    store: Arc<S>,
    settings: LeaseSettings,
    events: Arc<LockEvents>,
    created_at: Instant,
    state: Mutex<HandleState>,
    wake: Condvar,
}

impl<S: LeaseStore> LockHandle<S> {
    pub(crate) fn new(
        key: &str,
        lease_key: String,
        client_id: Arc<str>,
        store: Arc<S>,
        settings: LeaseSettings,
        events: Arc<LockEvents>,
    ) -> Self {
        LockHandle {
            key: key.to_string(),
            lease_key,
            client_id,
            store,
            settings,
            events,
            created_at: Instant::now(),
            state: Mutex::new(HandleState::default()),
            wake: Condvar::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The namespaced key the lease is stored under.
    pub fn lease_key(&self) -> &str {
        &self.lease_key
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When this handle last acquired its lease, if ever.
    pub fn last_acquired(&self) -> Option<Instant> {
        self.state_or_recover().last_acquired
    }

    /// Local view of the lease deadline while held.
    pub fn expires_at(&self) -> Option<Instant> {
        self.state_or_recover().expires_at
    }

    /// Token of the current holder, if held.
    pub fn owner(&self) -> Option<OwnerToken> {
        self.state_or_recover().owner.clone()
    }

    /// Extend the held lease by the configured TTL.
    ///
    /// Leases are never renewed automatically; a holder that may outlive the
    /// TTL calls this from its critical section.
    pub fn renew(&self) -> Result<(), LockError> {
        let token = {
            let state = self.state()?;
            match &state.owner {
                Some(token) if state.held_by_current_thread() => token.clone(),
                _ => return Err(self.not_held()),
            }
        };

        match self
            .store
            .renew_lease(&self.lease_key, &token, self.settings.lease_ttl)
        {
            Ok(true) => {
                let mut state = self.state()?;
                if state.owner.as_ref() == Some(&token) {
                    state.expires_at = Some(instant_after(Instant::now(), self.settings.lease_ttl));
                }
                debug!(key = %self.key, "lease renewed");
                Ok(())
            }
            Ok(false) => {
                warn!(key = %self.key, "lease lost before renewal");
                Err(LockError::LostLease {
                    key: self.key.clone(),
                })
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "lease renewal failed");
                Err(LockError::store(&self.key, err))
            }
        }
    }

    /// How long this handle has been unused, or `None` if it is busy.
    ///
    /// Never blocks: a gate held by another thread counts as busy. Measured
    /// from the last acquisition, or from creation for a handle never acquired.
    pub(crate) fn idle_for(&self, now: Instant) -> Option<Duration> {
        let state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::WouldBlock) => return None,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        if state.claimed || state.is_locked(now) {
            return None;
        }
        let last_used = state.last_acquired.unwrap_or(self.created_at);
        Some(now.saturating_duration_since(last_used))
    }

    fn not_held(&self) -> LockError {
        LockError::NotHeld {
            key: self.key.clone(),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, HandleState>, LockError> {
        self.state
            .lock()
            .map_err(|_| LockError::Poisoned(format!("lock handle {}", self.key)))
    }

    // Cleanup paths must make progress even after a panic elsewhere.
    fn state_or_recover(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until no other local thread claims the gate, then claim it.
    /// Returns `Ok(false)` if the deadline passes first.
    fn claim(&self, deadline: Instant) -> Result<bool, LockError> {
        let mut state = self.state()?;
        while state.claimed {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let (next, _) = self
                .wake
                .wait_timeout(state, deadline - now)
                .map_err(|_| LockError::Poisoned(format!("lock handle {}", self.key)))?;
            state = next;
        }
        state.claimed = true;
        state.holder = Some(thread::current().id());
        Ok(true)
    }

    fn unclaim(&self) {
        {
            let mut state = self.state_or_recover();
            state.claimed = false;
            state.holder = None;
            state.owner = None;
            state.expires_at = None;
        }
        self.wake.notify_one();
    }

    /// Poll the store until the lease is created or the deadline passes.
    fn create_lease(
        &self,
        token: &OwnerToken,
        deadline: Instant,
    ) -> Result<AcquireOutcome, LockError> {
        let mut backoff = self.settings.poll_interval_min;
        loop {
            match self
                .store
                .try_create_lease(&self.lease_key, token, self.settings.lease_ttl)
            {
                Ok(true) => return Ok(AcquireOutcome::Acquired),
                Ok(false) => {}
                Err(err) => {
                    warn!(key = %self.key, error = %err, "lease store error during acquire");
                    return Err(LockError::store(&self.key, err));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(AcquireOutcome::TimedOut);
            }
            thread::sleep(backoff.min(deadline - now));
            backoff = (backoff * 2).min(self.settings.poll_interval_max);
        }
    }
}

impl<S: LeaseStore> Lock for LockHandle<S> {
    fn try_acquire(&self, timeout: Duration) -> Result<AcquireOutcome, LockError> {
        let deadline = instant_after(Instant::now(), timeout);
        if !self.claim(deadline)? {
            debug!(key = %self.key, "timed out waiting for local holder");
            return Ok(AcquireOutcome::TimedOut);
        }

        let token = OwnerToken::generate(&self.client_id);
        match self.create_lease(&token, deadline) {
            Ok(AcquireOutcome::Acquired) => {}
            Ok(AcquireOutcome::TimedOut) => {
                self.unclaim();
                debug!(key = %self.key, "timed out waiting for lease");
                return Ok(AcquireOutcome::TimedOut);
            }
            Err(err) => {
                self.unclaim();
                return Err(err);
            }
        }

        let now = Instant::now();
        {
            let mut state = self.state_or_recover();
            state.owner = Some(token.clone());
            state.expires_at = Some(instant_after(now, self.settings.lease_ttl));
            state.last_acquired = Some(now);
        }
        debug!(key = %self.key, owner = %token, "lock acquired");
        self.events.emit(
            LOCK_ACQUIRED,
            LockEvent::new(self.key.clone(), Some(token.to_string())),
        );
        Ok(AcquireOutcome::Acquired)
    }

    fn release(&self) -> Result<(), LockError> {
        let token = {
            let mut state = self.state()?;
            if state.owner.is_none() {
                return Ok(());
            }
            if !state.held_by_current_thread() {
                debug!(key = %self.key, "release from a thread that does not hold the lock");
                return Err(self.not_held());
            }
            state.expires_at = None;
            let Some(token) = state.owner.take() else {
                return Ok(());
            };
            token
        };

        // The gate stays claimed during the remote delete so local waiters
        // do not race it to the store.
        let result = self.store.release_lease(&self.lease_key, &token);
        self.unclaim();
        self.events.emit(
            LOCK_RELEASED,
            LockEvent::new(self.key.clone(), Some(token.to_string())),
        );

        match result {
            Ok(true) => {
                debug!(key = %self.key, "lock released");
                Ok(())
            }
            Ok(false) => {
                warn!(key = %self.key, "lease had already expired or changed owner at release");
                Err(LockError::LostLease {
                    key: self.key.clone(),
                })
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "lease release failed; it will lapse at its TTL");
                Err(LockError::store(&self.key, err))
            }
        }
    }

    fn is_locked(&self) -> bool {
        self.state_or_recover().is_locked(Instant::now())
    }
}
