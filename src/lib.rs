//! Distributed per-key locks backed by a shared lease store.
//!
//! A [`LockRegistry`] hands out one [`LockHandle`] per resource key within a
//! process. Threads of the process queue on the handle's local gate; the one
//! that gets through writes a TTL lease into the shared [`LeaseStore`], which
//! is what excludes other processes. Leases lapse on their own if a holder
//! crashes, and a [`ReaperThread`] drops handles nobody has used for a while.
//!
//! ```ignore
//! use std::time::Duration;
//! use keyed_lock::{InMemoryLeaseStore, LockRegistry};
//!
//! let registry = LockRegistry::new(InMemoryLeaseStore::new());
//! if let Some(guard) = registry.try_lock("orders", Duration::from_secs(1))? {
//!     // exclusive access to "orders" until `guard` is dropped
//! }
//! ```

pub mod config;
pub mod events;
pub mod lease;
pub mod lock;
pub mod reaper;
pub mod registry;

#[cfg(feature = "http")]
pub mod service;

pub use config::{ConfigError, LockRegistryConfig, StoreConfig};
pub use events::{LockEvent, LockEvents};
pub use lease::{InMemoryLeaseStore, LeaseStore, OwnerToken, StoreError};
pub use lock::{AcquireOutcome, Lock, LockError, LockGuard, LockHandle, LockManager};
pub use reaper::{ReaperStats, ReaperThread};
pub use registry::LockRegistry;

#[cfg(feature = "redis")]
pub use lease::RedisLeaseStore;
