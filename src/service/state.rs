use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::lock::{LockGuard, LockManager};

use super::{Message, MessageRepository, ServiceError};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state of the HTTP service: where locks and messages come from.
pub struct AppState<M, R> {
    pub locks: Arc<M>,
    pub messages: Arc<R>,
    /// Longest a request waits for its key's lock.
    pub lock_timeout: Duration,
}

impl<M: LockManager, R: MessageRepository> AppState<M, R> {
    pub fn new(locks: Arc<M>, messages: Arc<R>) -> Self {
        AppState {
            locks,
            messages,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Store `text` under `key` unless a message is already there.
    ///
    /// Runs under `key`'s lock: read, wait `hold` (simulated work), write if
    /// absent. Returns the message stored under `key` afterwards. Blocks the
    /// calling thread.
    pub fn put_if_absent(
        &self,
        key: &str,
        text: &str,
        hold: Duration,
    ) -> Result<Option<Message>, ServiceError> {
        let lock = self.locks.obtain(key)?;
        let guard = LockGuard::acquire(lock, self.lock_timeout)?
            .ok_or_else(|| ServiceError::LockTimeout(key.to_string()))?;

        let existing = self.messages.get(key)?;
        thread::sleep(hold);
        if existing.is_some() {
            debug!(key, "message already present");
            return Ok(existing);
        }
        self.messages.set(key, &Message::new(text))?;
        drop(guard);

        Ok(self.messages.get(key)?)
    }

    pub fn get(&self, key: &str) -> Result<Option<Message>, ServiceError> {
        Ok(self.messages.get(key)?)
    }
}
