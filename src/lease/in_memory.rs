use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::{instant_after, LeaseStore, OwnerToken, StoreError};

/// A lease as stored by [`InMemoryLeaseStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseRecord {
    pub owner: OwnerToken,
    pub expires_at: Instant,
}

impl LeaseRecord {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time left before the lease lapses.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Lease store backed by a shared `HashMap`, with real TTL semantics.
///
/// Clones share the same records, so several registries built over clones of
/// one store behave like several processes talking to one Redis. The store can
/// be switched unavailable and given an artificial latency to exercise the
/// failure and timing paths of callers.
#[derive(Clone)]
pub struct InMemoryLeaseStore {
    records: Arc<Mutex<HashMap<String, LeaseRecord>>>,
    available: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
}

impl InMemoryLeaseStore {
    pub fn new() -> Self {
        InMemoryLeaseStore {
            records: Arc::new(Mutex::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            latency_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable` (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Add a fixed delay to every round trip.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// The live lease for `key`, if any.
    pub fn lease(&self, key: &str) -> Option<LeaseRecord> {
        let records = self.records.lock().ok()?;
        records.get(key).filter(|r| !r.is_expired()).cloned()
    }

    /// Number of live leases.
    pub fn live_leases(&self) -> usize {
        self.records
            .lock()
            .map(|records| records.values().filter(|r| !r.is_expired()).count())
            .unwrap_or(0)
    }

    /// Drop expired records. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        match self.records.lock() {
            Ok(mut records) => {
                let before = records.len();
                records.retain(|_, r| !r.is_expired());
                before - records.len()
            }
            Err(_) => 0,
        }
    }

    fn round_trip(&self) -> Result<(), StoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            thread::sleep(Duration::from_millis(latency));
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store switched off".into()))
        }
    }

    fn records(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, LeaseRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("lease map poisoned".into()))
    }
}

impl Default for InMemoryLeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseStore for InMemoryLeaseStore {
    fn try_create_lease(
        &self,
        key: &str,
        owner: &OwnerToken,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.round_trip()?;
        let mut records = self.records()?;
        if let Some(existing) = records.get(key) {
            if !existing.is_expired() {
                return Ok(false);
            }
        }
        records.insert(
            key.to_string(),
            LeaseRecord {
                owner: owner.clone(),
                expires_at: instant_after(Instant::now(), ttl),
            },
        );
        Ok(true)
    }

    fn renew_lease(
        &self,
        key: &str,
        owner: &OwnerToken,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.round_trip()?;
        let mut records = self.records()?;
        match records.get_mut(key) {
            Some(record) if !record.is_expired() && record.owner == *owner => {
                record.expires_at = instant_after(Instant::now(), ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn release_lease(&self, key: &str, owner: &OwnerToken) -> Result<bool, StoreError> {
        self.round_trip()?;
        let mut records = self.records()?;
        let ours = matches!(
            records.get(key),
            Some(record) if !record.is_expired() && record.owner == *owner
        );
        if ours {
            records.remove(key);
        }
        Ok(ours)
    }
}
