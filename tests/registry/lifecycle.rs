//! Acquire, release, expiry and timeout behavior.

use std::thread;
use std::time::{Duration, Instant};

use keyed_lock::{AcquireOutcome, InMemoryLeaseStore, Lock, LockError};

use crate::support::{process, POLL_MAX};

#[test]
fn acquire_release_acquire_round_trip() {
    let store = InMemoryLeaseStore::new();
    let registry = process(&store, Duration::from_secs(30));
    let handle = registry.obtain("orders").unwrap();

    assert_eq!(handle.try_acquire(Duration::ZERO).unwrap(), AcquireOutcome::Acquired);
    let first = handle.owner().unwrap();
    handle.release().unwrap();
    assert!(!handle.is_locked());
    assert!(store.lease("it:orders").is_none());

    assert_eq!(handle.try_acquire(Duration::ZERO).unwrap(), AcquireOutcome::Acquired);
    let second = handle.owner().unwrap();
    assert_ne!(first, second, "every acquisition gets a fresh owner token");
    assert_eq!(first.client_id(), second.client_id());
}

#[test]
fn release_lets_other_process_in() {
    let store = InMemoryLeaseStore::new();
    let a = process(&store, Duration::from_secs(30));
    let b = process(&store, Duration::from_secs(30));

    let guard = a.try_lock("orders", Duration::ZERO).unwrap().unwrap();
    assert!(b.try_lock("orders", Duration::ZERO).unwrap().is_none());

    guard.release().unwrap();
    assert!(b.try_lock("orders", Duration::ZERO).unwrap().is_some());
}

#[test]
fn expired_lease_lets_other_process_in() {
    let store = InMemoryLeaseStore::new();
    let crashed = process(&store, Duration::from_millis(100));
    let survivor = process(&store, Duration::from_secs(30));

    // The first holder never releases.
    let stuck = crashed.obtain("orders").unwrap();
    assert!(stuck.try_acquire(Duration::ZERO).unwrap().is_acquired());

    let start = Instant::now();
    let guard = survivor.try_lock("orders", Duration::from_secs(2)).unwrap();
    assert!(guard.is_some());
    assert!(start.elapsed() >= Duration::from_millis(50));

    // The stale holder's release must not touch the new lease.
    assert!(matches!(stuck.release(), Err(LockError::LostLease { .. })));
    let record = store.lease("it:orders").unwrap();
    assert_eq!(record.owner.client_id(), survivor.client_id());
}

#[test]
fn timeout_is_honored_within_one_poll_interval() {
    let store = InMemoryLeaseStore::new();
    let holder = process(&store, Duration::from_secs(30));
    let waiter = process(&store, Duration::from_secs(30));
    let _held = holder.try_lock("orders", Duration::ZERO).unwrap().unwrap();

    let timeout = Duration::from_millis(150);
    let start = Instant::now();
    let outcome = waiter
        .obtain("orders")
        .unwrap()
        .try_acquire(timeout)
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcome, AcquireOutcome::TimedOut);
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + POLL_MAX + Duration::from_millis(100));
}

#[test]
fn zero_timeout_still_tries_once() {
    let store = InMemoryLeaseStore::new();
    let registry = process(&store, Duration::from_secs(30));
    let handle = registry.obtain("orders").unwrap();
    assert_eq!(handle.try_acquire(Duration::ZERO).unwrap(), AcquireOutcome::Acquired);
}

#[test]
fn local_waiter_proceeds_when_holder_releases() {
    let store = InMemoryLeaseStore::new();
    let registry = process(&store, Duration::from_secs(30));
    let guard = registry.try_lock("orders", Duration::ZERO).unwrap().unwrap();

    let waiter = {
        let registry = registry.clone();
        thread::spawn(move || {
            let start = Instant::now();
            let guard = registry.try_lock("orders", Duration::from_secs(5)).unwrap();
            (guard.is_some(), start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(100));
    drop(guard);

    let (acquired, waited) = waiter.join().unwrap();
    assert!(acquired);
    assert!(waited >= Duration::from_millis(50));
    assert!(waited < Duration::from_secs(2));
    assert_eq!(store.live_leases(), 0);
}

#[test]
fn guard_releases_when_critical_section_panics() {
    let store = InMemoryLeaseStore::new();
    let registry = process(&store, Duration::from_secs(30));

    let worker = {
        let registry = registry.clone();
        thread::spawn(move || {
            let _guard = registry.try_lock("orders", Duration::ZERO).unwrap().unwrap();
            panic!("critical section failed");
        })
    };
    assert!(worker.join().is_err());

    assert!(!registry.obtain("orders").unwrap().is_locked());
    assert!(store.lease("it:orders").is_none());
    assert!(registry.try_lock("orders", Duration::ZERO).unwrap().is_some());
}

#[test]
fn renew_extends_past_original_ttl() {
    let store = InMemoryLeaseStore::new();
    let holder = process(&store, Duration::from_millis(200));
    let other = process(&store, Duration::from_secs(30));

    let guard = holder.try_lock("orders", Duration::ZERO).unwrap().unwrap();
    thread::sleep(Duration::from_millis(120));
    guard.renew().unwrap();
    thread::sleep(Duration::from_millis(120));

    // Past the original TTL, but still inside the renewed one.
    assert!(other.try_lock("orders", Duration::ZERO).unwrap().is_none());
    guard.release().unwrap();
}
