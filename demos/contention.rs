//! Two "processes" sharing one in-memory lease store contend for a key.
//!
//! ```text
//! cargo run --example contention
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use keyed_lock::events::{LOCK_ACQUIRED, LOCK_EVICTED, LOCK_RELEASED};
use keyed_lock::{InMemoryLeaseStore, LockEvent, LockRegistry, LockRegistryConfig, ReaperThread};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = InMemoryLeaseStore::new();
    let config = LockRegistryConfig::default()
        .with_lease_ttl(Duration::from_secs(5))
        .with_max_idle_age(Duration::from_millis(500))
        .with_sweep_interval(Duration::from_millis(100));

    let a = Arc::new(LockRegistry::with_config(store.clone(), config.clone())?);
    let b = Arc::new(LockRegistry::with_config(store, config)?);

    for (name, registry) in [("a", &a), ("b", &b)] {
        for event in [LOCK_ACQUIRED, LOCK_RELEASED, LOCK_EVICTED] {
            registry.events().on(event, move |data| match LockEvent::from_json(&data) {
                Ok(e) => println!("[{name}] {event} {}", e.key),
                Err(err) => println!("[{name}] bad event payload: {err}"),
            });
        }
    }
    let reaper = ReaperThread::from_config(Arc::clone(&b))?;

    let holder = {
        let a = Arc::clone(&a);
        thread::spawn(move || {
            if let Ok(Some(_guard)) = a.try_lock("orders", Duration::from_secs(1)) {
                println!("a: working on orders");
                thread::sleep(Duration::from_millis(300));
            }
        })
    };
    thread::sleep(Duration::from_millis(50));

    match b.try_lock("orders", Duration::from_millis(100))? {
        Some(_) => println!("b: got orders early"),
        None => println!("b: orders busy, timed out"),
    }
    match b.try_lock("orders", Duration::from_secs(1))? {
        Some(_) => println!("b: got orders after a released it"),
        None => println!("b: still busy"),
    }
    let _ = holder.join();

    thread::sleep(Duration::from_secs(1));
    let stats = reaper.stop();
    println!("b: reaper evicted {} handle(s), {} left", stats.evicted, b.len());
    Ok(())
}
