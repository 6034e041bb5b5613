//! The locked read-then-write flow, without HTTP.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use keyed_lock::service::ServiceError;
use keyed_lock::InMemoryLeaseStore;

use crate::support::test_state;

#[test]
fn first_writer_wins() {
    let store = InMemoryLeaseStore::new();
    let state = test_state(&store, Duration::from_secs(5));

    let first = state.put_if_absent("k", "hello", Duration::ZERO).unwrap().unwrap();
    assert_eq!(first.text, "hello");
    assert_eq!(first.count, 1);

    let second = state.put_if_absent("k", "other", Duration::ZERO).unwrap().unwrap();
    assert_eq!(second.text, "hello");
    assert_eq!(state.get("k").unwrap().unwrap().text, "hello");
    assert!(state.get("missing").unwrap().is_none());
}

#[test]
fn concurrent_writers_store_one_message() {
    let store = InMemoryLeaseStore::new();
    let state = test_state(&store, Duration::from_secs(5));

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                state
                    .put_if_absent("k", &format!("writer-{i}"), Duration::from_millis(20))
                    .unwrap()
                    .unwrap()
            })
        })
        .collect();

    let seen: Vec<_> = writers.into_iter().map(|w| w.join().unwrap().text).collect();
    assert!(seen.iter().all(|text| *text == seen[0]));
    assert_eq!(store.live_leases(), 0);
}

#[test]
fn contention_past_timeout_is_lock_timeout() {
    let store = InMemoryLeaseStore::new();
    let slow = test_state(&store, Duration::from_secs(5));
    let impatient = test_state(&store, Duration::from_millis(50));

    let holder = {
        let slow = Arc::clone(&slow);
        thread::spawn(move || slow.put_if_absent("k", "slow", Duration::from_millis(400)))
    };
    thread::sleep(Duration::from_millis(50));

    let err = impatient
        .put_if_absent("k", "fast", Duration::ZERO)
        .unwrap_err();
    assert!(matches!(err, ServiceError::LockTimeout(ref key) if key == "k"));
    assert_eq!(err.status_code(), 409);
    assert_eq!(err.to_string(), "Cannot acquire lock for key: k");

    holder.join().unwrap().unwrap();
}

#[test]
fn store_outage_maps_to_unavailable() {
    let store = InMemoryLeaseStore::new();
    let state = test_state(&store, Duration::from_millis(50));
    store.set_available(false);

    let err = state.put_if_absent("k", "hello", Duration::ZERO).unwrap_err();
    assert_eq!(err.status_code(), 503);
}
