//! Demo HTTP server: one message per key, written under the key's distributed lock.
//!
//! ```text
//! KEYED_LOCK_STORE=redis KEYED_LOCK_REDIS_URL=redis://127.0.0.1:6379 \
//!     cargo run --example server --features http,redis
//! curl localhost:8080/orders/hello/2000
//! curl localhost:8080/orders
//! ```
//!
//! The default in-memory store only excludes requests served by this one
//! process.

use std::sync::Arc;

use keyed_lock::lease;
use keyed_lock::service::{self, AppState, InMemoryMessageRepository};
use keyed_lock::{LockRegistry, LockRegistryConfig, ReaperThread};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = LockRegistryConfig::from_env()?;
    let store = lease::connect(&config.store)?;
    let registry = Arc::new(LockRegistry::from_shared(Arc::new(store), config)?);
    let reaper = ReaperThread::from_config(Arc::clone(&registry))?;

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let state = Arc::new(AppState::new(
        Arc::clone(&registry),
        Arc::new(InMemoryMessageRepository::new()),
    ));
    info!(%addr, client_id = registry.client_id(), "listening");
    service::serve(state, &addr).await?;

    let stats = reaper.stop();
    info!(evicted = stats.evicted, "shut down");
    Ok(())
}
