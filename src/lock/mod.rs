mod error;
mod guard;
mod handle;
mod lock;
mod lock_manager;

pub use error::LockError;
pub use guard::LockGuard;
pub use handle::{LeaseSettings, LockHandle};
pub use lock::{AcquireOutcome, Lock};
pub use lock_manager::LockManager;
