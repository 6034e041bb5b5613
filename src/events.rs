//! In-process lock lifecycle notifications.
//!
//! Listeners receive the JSON form of a [`LockEvent`]. Delivery goes through
//! `event_emitter_rs`, which runs each listener on its own thread, so a slow
//! listener never delays an acquire or release. Without the `emitter` feature
//! events are only traced.

#[cfg(feature = "emitter")]
use std::sync::Mutex;

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const LOCK_ACQUIRED: &str = "lock.acquired";
pub const LOCK_RELEASED: &str = "lock.released";
pub const LOCK_EVICTED: &str = "lock.evicted";

/// Payload delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEvent {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl LockEvent {
    pub fn new(key: impl Into<String>, owner: Option<String>) -> Self {
        LockEvent {
            key: key.into(),
            owner,
        }
    }

    /// Decode a payload received by a listener.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

pub struct LockEvents {
    #[cfg(feature = "emitter")]
    emitter: Mutex<EventEmitter>,
}

impl Default for LockEvents {
    fn default() -> Self {
        LockEvents {
            #[cfg(feature = "emitter")]
            emitter: Mutex::new(EventEmitter::new()),
        }
    }
}

impl LockEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one of the `LOCK_*` event names.
    #[cfg(feature = "emitter")]
    pub fn on<F>(&self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        if let Ok(mut emitter) = self.emitter.lock() {
            emitter.on(event, listener);
        }
    }

    pub(crate) fn emit(&self, event: &str, payload: LockEvent) {
        trace!(event, key = %payload.key, "lock event");
        #[cfg(feature = "emitter")]
        {
            let data = match serde_json::to_string(&payload) {
                Ok(data) => data,
                Err(_) => return,
            };
            if let Ok(mut emitter) = self.emitter.lock() {
                emitter.emit(event, data);
            }
        }
    }
}
