//! End-to-end timelines, scaled down from seconds to milliseconds.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use keyed_lock::{AcquireOutcome, InMemoryLeaseStore, Lock, LockRegistry, ReaperThread};

use crate::support::{config, process};

/// TTL 5, idle age 30, sweep 1: "x" is acquired at 0, released at 2 and is
/// gone from the registry by 32.
#[test]
fn released_key_is_reaped_after_idle_age() {
    let unit = Duration::from_millis(10);
    let registry = Arc::new(LockRegistry::with_config(
        InMemoryLeaseStore::new(),
        config(unit * 5)
            .with_max_idle_age(unit * 30)
            .with_sweep_interval(unit),
    )
    .unwrap());
    let reaper = ReaperThread::from_config(Arc::clone(&registry)).unwrap();

    let guard = registry.try_lock("x", Duration::ZERO).unwrap().unwrap();
    thread::sleep(unit * 2);
    guard.release().unwrap();
    assert_eq!(registry.len(), 1);

    // Still present well inside the idle age.
    thread::sleep(unit * 10);
    assert!(registry.contains("x"));

    thread::sleep(unit * 30);
    assert!(!registry.contains("x"));
    assert_eq!(registry.len(), 0);
    reaper.stop();
}

fn race_for_orders(hold: Duration, timeout: Duration) -> Vec<(AcquireOutcome, Duration)> {
    let store = InMemoryLeaseStore::new();
    let barrier = Arc::new(Barrier::new(2));

    let racers: Vec<_> = (0..2)
        .map(|_| {
            let registry = process(&store, Duration::from_secs(30));
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let handle = registry.obtain("orders").unwrap();
                barrier.wait();
                let start = std::time::Instant::now();
                let outcome = handle.try_acquire(timeout).unwrap();
                let waited = start.elapsed();
                if outcome.is_acquired() {
                    thread::sleep(hold);
                    handle.release().unwrap();
                }
                (outcome, waited)
            })
        })
        .collect();

    racers.into_iter().map(|r| r.join().unwrap()).collect()
}

/// Two processes race for "orders"; the winner holds past the timeout.
#[test]
fn loser_times_out_when_winner_holds_past_timeout() {
    let results = race_for_orders(Duration::from_millis(400), Duration::from_millis(100));
    let acquired = results.iter().filter(|(o, _)| o.is_acquired()).count();
    let timed_out = results
        .iter()
        .filter(|(o, _)| *o == AcquireOutcome::TimedOut)
        .count();
    assert_eq!((acquired, timed_out), (1, 1));
}

/// Two processes race for "orders"; the winner releases inside the timeout.
#[test]
fn loser_acquires_when_winner_releases_in_time() {
    let results = race_for_orders(Duration::from_millis(50), Duration::from_secs(2));
    assert!(results.iter().all(|(o, _)| o.is_acquired()));
    let longest = results.iter().map(|(_, waited)| *waited).max().unwrap();
    assert!(longest >= Duration::from_millis(25));
}
