//! Payload written under a key while its lock is held.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lease::instant_after;

const KEY_PREFIX: &str = "tmp:MESSAGES";
const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub count: u64,
    pub time: SystemTime,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Message {
            text: text.into(),
            count: 1,
            time: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("message storage error: {0}")]
    Storage(String),
    #[error("message serialization error: {0}")]
    Serde(String),
}

/// Storage for messages keyed by resource key.
pub trait MessageRepository: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Message>, MessageError>;
    fn set(&self, key: &str, message: &Message) -> Result<(), MessageError>;
}

struct StoredMessage {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// HashMap-backed message repository whose entries expire after a TTL.
///
/// Storage key is `"tmp:MESSAGES{key}"`. Clone-friendly via Arc.
#[derive(Clone)]
pub struct InMemoryMessageRepository {
    storage: Arc<RwLock<HashMap<String, StoredMessage>>>,
    ttl: Duration,
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        InMemoryMessageRepository {
            storage: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    fn make_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

impl MessageRepository for InMemoryMessageRepository {
    fn get(&self, key: &str) -> Result<Option<Message>, MessageError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| MessageError::Storage("lock poisoned".into()))?;

        match storage.get(&Self::make_key(key)) {
            Some(stored) if Instant::now() < stored.expires_at => {
                let message = serde_json::from_slice(&stored.bytes)
                    .map_err(|e| MessageError::Serde(e.to_string()))?;
                Ok(Some(message))
            }
            _ => Ok(None),
        }
    }

    fn set(&self, key: &str, message: &Message) -> Result<(), MessageError> {
        let bytes =
            serde_json::to_vec(message).map_err(|e| MessageError::Serde(e.to_string()))?;

        let mut storage = self
            .storage
            .write()
            .map_err(|_| MessageError::Storage("lock poisoned".into()))?;

        let now = Instant::now();
        storage.retain(|_, stored| now < stored.expires_at);
        storage.insert(
            Self::make_key(key),
            StoredMessage {
                bytes,
                expires_at: instant_after(now, self.ttl),
            },
        );
        Ok(())
    }
}
