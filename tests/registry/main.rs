//! Lock registry integration tests.
//!
//! Separate `LockRegistry` instances over clones of one `InMemoryLeaseStore`
//! stand in for separate processes sharing one store.


mod lifecycle;
mod reaper;
mod scenarios;
