use std::sync::Arc;
use std::time::Duration;

use keyed_lock::service::{AppState, InMemoryMessageRepository};
use keyed_lock::{InMemoryLeaseStore, LockRegistry, LockRegistryConfig};

pub type TestState = AppState<LockRegistry<InMemoryLeaseStore>, InMemoryMessageRepository>;

/// Service state over its own store; `lock_timeout` bounds every request's wait.
pub fn test_state(store: &InMemoryLeaseStore, lock_timeout: Duration) -> Arc<TestState> {
    let registry = LockRegistry::with_config(
        store.clone(),
        LockRegistryConfig::default()
            .with_registry_key("svc")
            .with_poll_interval(Duration::from_millis(5), Duration::from_millis(20)),
    )
    .unwrap();
    Arc::new(
        AppState::new(Arc::new(registry), Arc::new(InMemoryMessageRepository::new()))
            .with_lock_timeout(lock_timeout),
    )
}
