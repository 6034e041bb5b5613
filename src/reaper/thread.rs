//! Background eviction of idle lock handles.
//!
//! Without it a registry keeps one handle per distinct key it has ever seen,
//! which grows without bound when keys are per-request identifiers.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, trace, warn};

use crate::lease::LeaseStore;
use crate::registry::LockRegistry;

/// Statistics from the reaper.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReaperStats {
    pub sweeps: usize,
    pub evicted: usize,
    /// Sweeps that failed on a poisoned registry map.
    pub failed_sweeps: usize,
}

/// A background thread that periodically evicts idle handles from a registry.
///
/// Each sweep removes handles that are unlocked, referenced by nobody but the
/// registry, and unused for longer than `max_idle_age`. Handles whose gate is
/// busy are skipped until a later sweep; the reaper never waits on them.
///
/// ## Example
///
/// ```ignore
/// use std::sync::Arc;
/// use std::time::Duration;
/// use keyed_lock::{InMemoryLeaseStore, LockRegistry, ReaperThread};
///
/// let registry = Arc::new(LockRegistry::new(InMemoryLeaseStore::new()));
/// let reaper = ReaperThread::spawn(
///     Arc::clone(&registry),
///     Duration::from_secs(1),
///     Duration::from_secs(30),
/// )?;
///
/// // ... use the registry ...
///
/// let stats = reaper.stop();
/// println!("evicted {} handles", stats.evicted);
/// ```
pub struct ReaperThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<ReaperStats>>,
}

impl ReaperThread {
    /// Spawn a reaper using the sweep interval and idle age from the registry's config.
    pub fn from_config<S>(registry: Arc<LockRegistry<S>>) -> std::io::Result<Self>
    where
        S: LeaseStore + 'static,
    {
        let interval = registry.config().sweep_interval();
        let max_idle_age = registry.config().max_idle_age();
        Self::spawn(registry, interval, max_idle_age)
    }

    /// Spawn a new reaper thread sweeping every `interval`.
    ///
    /// A zero `interval` is rejected with `InvalidInput`.
    pub fn spawn<S>(
        registry: Arc<LockRegistry<S>>,
        interval: Duration,
        max_idle_age: Duration,
    ) -> std::io::Result<Self>
    where
        S: LeaseStore + 'static,
    {
        if interval.is_zero() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "reaper sweep interval must be positive",
            ));
        }
        let (stop_tx, stop_rx) = channel();

        let handle = thread::Builder::new()
            .name("lock-reaper".into())
            .spawn(move || {
                let mut stats = ReaperStats::default();
                info!(?interval, ?max_idle_age, "lock reaper started");

                loop {
                    // Sleep until the next sweep, waking early on stop.
                    match stop_rx.recv_timeout(interval) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    stats.sweeps += 1;
                    match registry.expire_unused_older_than(max_idle_age) {
                        Ok(evicted) => {
                            stats.evicted += evicted;
                            trace!(evicted, remaining = registry.len(), "reaper sweep");
                        }
                        Err(err) => {
                            stats.failed_sweeps += 1;
                            warn!(error = %err, "reaper sweep failed");
                        }
                    }
                }

                info!(
                    sweeps = stats.sweeps,
                    evicted = stats.evicted,
                    "lock reaper stopped"
                );
                stats
            })?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Signal the reaper to stop and wait for it to finish.
    /// Returns the reaper statistics.
    pub fn stop(mut self) -> ReaperStats {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            ReaperStats::default()
        }
    }

    /// Signal the reaper to stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for ReaperThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        // Don't join on drop - the thread exits at its next wake-up
    }
}
