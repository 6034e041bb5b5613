use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity written into a lease record by the acquiring call.
///
/// Format is `"{client_id}:{uuid}"`, so the store shows which process owns a
/// lease while every acquisition still gets a token of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerToken(String);

impl OwnerToken {
    /// Generate a fresh token for the given client.
    pub fn generate(client_id: &str) -> Self {
        OwnerToken(format!("{}:{}", client_id, Uuid::new_v4()))
    }

    /// Wrap an existing token string (e.g. one read back from a store).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        OwnerToken(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The client id part of the token.
    pub fn client_id(&self) -> &str {
        self.0.rsplit_once(':').map(|(client, _)| client).unwrap_or("")
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a client id unique to this registry instance.
///
/// Includes the OS process id so lease records can be traced back to a process.
pub fn new_client_id() -> String {
    format!("{}-{}", Uuid::new_v4(), std::process::id())
}
