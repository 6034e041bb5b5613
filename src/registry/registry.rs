use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::{ConfigError, LockRegistryConfig};
use crate::events::{LockEvent, LockEvents, LOCK_EVICTED};
use crate::lease::{new_client_id, LeaseStore};
use crate::lock::{LeaseSettings, LockError, LockGuard, LockHandle, LockManager};

/// Process-local registry of lease-backed locks, one handle per key.
///
/// `obtain` hands out clones of a single `Arc<LockHandle>` per key, so every
/// thread of this process contending for a key queues on the same local gate
/// and only one of them talks to the store at a time. The map mutex is held
/// only for lookup-or-insert and for the reaper's per-key check-and-remove,
/// never across a store call.
///
/// Several registries sharing one store (e.g. clones of an
/// [`InMemoryLeaseStore`](crate::lease::InMemoryLeaseStore)) behave like
/// several processes.
pub struct LockRegistry<S: LeaseStore> {
    store: Arc<S>,
    config: LockRegistryConfig,
    settings: LeaseSettings,
    client_id: Arc<str>,
    events: Arc<LockEvents>,
    locks: Mutex<HashMap<String, Arc<LockHandle<S>>>>,
}

impl<S: LeaseStore> LockRegistry<S> {
    /// Create a registry with default configuration.
    pub fn new(store: S) -> Self {
        Self::build(Arc::new(store), LockRegistryConfig::default())
    }

    /// Create a registry with `config`, rejecting it if it fails
    /// [`validate`](LockRegistryConfig::validate).
    pub fn with_config(store: S, config: LockRegistryConfig) -> Result<Self, ConfigError> {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create a registry over a store that is already shared.
    pub fn from_shared(store: Arc<S>, config: LockRegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<S>, config: LockRegistryConfig) -> Self {
        let settings = LeaseSettings::from(&config);
        LockRegistry {
            store,
            config,
            settings,
            client_id: Arc::from(new_client_id()),
            events: Arc::new(LockEvents::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LockRegistryConfig {
        &self.config
    }

    /// Identity of this registry, embedded in every owner token it writes.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Lock lifecycle notifications for this registry.
    pub fn events(&self) -> &LockEvents {
        &self.events
    }

    /// Get the handle for `key`, creating it on first use.
    pub fn obtain(&self, key: &str) -> Result<Arc<LockHandle<S>>, LockError> {
        let mut locks = self.locks()?;
        if let Some(handle) = locks.get(key) {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(LockHandle::new(
            key,
            self.config.lease_key(key),
            Arc::clone(&self.client_id),
            Arc::clone(&self.store),
            self.settings,
            Arc::clone(&self.events),
        ));
        locks.insert(key.to_string(), Arc::clone(&handle));
        debug!(key, "lock handle created");
        Ok(handle)
    }

    /// Obtain the lock for `key` and acquire it as a scoped guard.
    /// `Ok(None)` means the timeout elapsed.
    pub fn try_lock(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<LockGuard<LockHandle<S>>>, LockError> {
        LockGuard::acquire(self.obtain(key)?, timeout)
    }

    /// Renew the lease currently held through `key`'s handle.
    pub fn renew(&self, key: &str) -> Result<(), LockError> {
        let handle = self
            .locks()?
            .get(key)
            .cloned()
            .ok_or_else(|| LockError::NotHeld {
                key: key.to_string(),
            })?;
        handle.renew()
    }

    /// Remove `key`'s handle if nobody can be using it.
    ///
    /// Returns `Ok(false)` when the entry is absent or still in use.
    pub fn remove(&self, key: &str) -> Result<bool, LockError> {
        self.remove_if(key, |_| true)
    }

    /// Evict every handle that is unused and has been idle for longer than `age`.
    ///
    /// Works from a snapshot of the keys and takes the map lock once per key,
    /// so concurrent `obtain` calls interleave with the sweep. Returns the
    /// number of handles removed.
    pub fn expire_unused_older_than(&self, age: Duration) -> Result<usize, LockError> {
        let keys = self.keys()?;
        let mut evicted = 0;
        for key in keys {
            if self.remove_if(&key, |idle| idle > age)? {
                evicted += 1;
            }
        }
        Ok(evicted)
    }

    /// Number of handles currently registered.
    ///
    /// Reads through a poisoned map: no map operation can panic halfway, so
    /// the entries stay accurate even when `obtain` reports `Poisoned`.
    pub fn len(&self) -> usize {
        self.locks_or_recover().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` has a handle. Reads through a poisoned map like [`len`](Self::len).
    pub fn contains(&self, key: &str) -> bool {
        self.locks_or_recover().contains_key(key)
    }

    /// Snapshot of the registered keys.
    pub fn keys(&self) -> Result<Vec<String>, LockError> {
        Ok(self.locks()?.keys().cloned().collect())
    }

    // A handle may go only when the map holds the sole reference (no caller
    // can be about to acquire it) and its gate is free, unclaimed and unlocked.
    fn remove_if(
        &self,
        key: &str,
        idle_enough: impl Fn(Duration) -> bool,
    ) -> Result<bool, LockError> {
        let mut locks = self.locks()?;
        let removable = match locks.get(key) {
            Some(handle) if Arc::strong_count(handle) == 1 => handle
                .idle_for(Instant::now())
                .is_some_and(idle_enough),
            _ => false,
        };
        if !removable {
            return Ok(false);
        }
        locks.remove(key);
        drop(locks);

        debug!(key, "lock handle evicted");
        self.events
            .emit(LOCK_EVICTED, LockEvent::new(key.to_string(), None));
        Ok(true)
    }

    fn locks_or_recover(&self) -> MutexGuard<'_, HashMap<String, Arc<LockHandle<S>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn locks(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<LockHandle<S>>>>, LockError> {
        self.locks
            .lock()
            .map_err(|_| LockError::Poisoned("lock registry map poisoned".into()))
    }
}

impl<S: LeaseStore> LockManager for LockRegistry<S> {
    type Lock = LockHandle<S>;

    fn obtain(&self, key: &str) -> Result<Arc<LockHandle<S>>, LockError> {
        LockRegistry::obtain(self, key)
    }
}
