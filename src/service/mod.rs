//! Demo request service: one message per key, written under the key's lock.
//!
//! Requires the `http` feature.

mod error;
mod http;
mod message;
mod state;

pub use error::ServiceError;
pub use http::{router, serve};
pub use message::{InMemoryMessageRepository, Message, MessageError, MessageRepository};
pub use state::AppState;
