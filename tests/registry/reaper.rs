//! Idle-handle eviction running beside live traffic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use keyed_lock::{InMemoryLeaseStore, LockRegistry, ReaperThread};

use crate::support::{config, process};

#[test]
fn reaper_sweeps_alongside_live_traffic() {
    let store = InMemoryLeaseStore::new();
    let registry = process(&store, Duration::from_secs(30));
    let reaper = ReaperThread::spawn(
        Arc::clone(&registry),
        Duration::from_millis(1),
        Duration::ZERO,
    )
    .unwrap();

    let running = Arc::new(AtomicBool::new(true));
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let key = format!("key-{}", i % 2);
                let mut acquired = 0;
                while running.load(Ordering::SeqCst) {
                    let guard = registry.try_lock(&key, Duration::from_secs(5)).unwrap();
                    assert!(guard.is_some());
                    acquired += 1;
                }
                acquired
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(300));
    running.store(false, Ordering::SeqCst);
    let total: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert!(total > 0);

    let stats = reaper.stop();
    assert!(stats.sweeps > 0);
    assert_eq!(stats.failed_sweeps, 0);
    assert_eq!(store.live_leases(), 0);
}

#[test]
fn reaper_started_from_config_evicts_released_keys() {
    let store = InMemoryLeaseStore::new();
    let registry = Arc::new(LockRegistry::with_config(
        store,
        config(Duration::from_millis(50))
            .with_max_idle_age(Duration::from_millis(100))
            .with_sweep_interval(Duration::from_millis(10)),
    )
    .unwrap());
    let reaper = ReaperThread::from_config(Arc::clone(&registry)).unwrap();

    registry
        .try_lock("x", Duration::ZERO)
        .unwrap()
        .unwrap()
        .release()
        .unwrap();
    assert!(registry.contains("x"));

    thread::sleep(Duration::from_millis(400));
    assert!(!registry.contains("x"));
    assert!(reaper.stop().evicted >= 1);
}
