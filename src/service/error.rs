//! Error types for the HTTP demo service.

use thiserror::Error;

use crate::lock::LockError;

use super::MessageError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The lock stayed held by someone else for the whole wait.
    #[error("Cannot acquire lock for key: {0}")]
    LockTimeout(String),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Messages(#[from] MessageError),
    #[error("worker task failed: {0}")]
    Task(String),
}

impl ServiceError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::LockTimeout(_) => 409,
            ServiceError::Lock(LockError::StoreUnavailable { .. }) => 503,
            ServiceError::Lock(_) | ServiceError::Messages(_) | ServiceError::Task(_) => 500,
        }
    }
}
