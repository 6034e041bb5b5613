//! HTTP transport: maps requests onto the locking API.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `GET /:key/:message/:sleep`: under `key`'s lock, store `message` if no
//!   message exists yet, holding the lock `sleep` ms. Returns the stored message.
//! - `GET /:key`: the stored message, or `null`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::lock::LockManager;

use super::{AppState, MessageRepository, ServiceError};

/// Build an axum `Router` over the given state.
pub fn router<M, R>(state: Arc<AppState<M, R>>) -> Router
where
    M: LockManager + 'static,
    R: MessageRepository + 'static,
{
    Router::new()
        .route("/:key", get(get_handler::<M, R>))
        .route("/:key/:message/:sleep", get(put_handler::<M, R>))
        .with_state(state)
}

/// Serve over HTTP at the given address (e.g. `"0.0.0.0:8080"`).
pub async fn serve<M, R>(state: Arc<AppState<M, R>>, addr: &str) -> Result<(), std::io::Error>
where
    M: LockManager + 'static,
    R: MessageRepository + 'static,
{
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn put_handler<M, R>(
    State(state): State<Arc<AppState<M, R>>>,
    Path((key, message, sleep)): Path<(String, String, u64)>,
) -> Response
where
    M: LockManager + 'static,
    R: MessageRepository + 'static,
{
    // Lock acquisition blocks; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        state.put_if_absent(&key, &message, Duration::from_millis(sleep))
    })
    .await
    .unwrap_or_else(|e| Err(ServiceError::Task(e.to_string())));

    match result {
        Ok(message) => (StatusCode::OK, Json(message)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_handler<M, R>(
    State(state): State<Arc<AppState<M, R>>>,
    Path(key): Path<String>,
) -> Response
where
    M: LockManager + 'static,
    R: MessageRepository + 'static,
{
    match state.get(&key) {
        Ok(message) => (StatusCode::OK, Json(message)).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: ServiceError) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}
