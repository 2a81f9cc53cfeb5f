//! Idempotency middleware for guarded routes.
//!
//! # Responsibilities
//! - Require a non-empty `Idempotency-Key` header
//! - Run the handler at most once per key, buffering its response body
//! - Replay the stored body for every retry of the same key
//!
//! # Design Decisions
//! - Opt-in: applied with `route_layer` to guarded routes only
//! - The pending marker is published before the handler runs, so two
//!   racing first-time requests cannot both execute it
//! - Replays always carry 200, whatever status the original had
//! - The store commits only on successful body capture; a capture fault
//!   reopens the key

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::idempotency::store::{Begin, Entry, IdempotencyStore};
use crate::observability::metrics;
use crate::problem::{GatewayError, Problem, ProblemContext};

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// Cap on a buffered response body. A handler response that exceeds it is
/// a capture fault, not a truncated cache entry.
const MAX_CAPTURED_BODY: usize = 2 * 1024 * 1024;

pub async fn idempotency_middleware(
    State(store): State<IdempotencyStore>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let context = ProblemContext::of(&request);

    let key = match request
        .headers()
        .get(IDEMPOTENCY_KEY)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        Some(key) => key.to_string(),
        None => {
            return Problem::from_error(&GatewayError::MissingIdempotencyKey, &context)
                .into_response();
        }
    };

    if let Some(body) = claim(&store, &key).await {
        tracing::debug!(key = %key, request_id = %context.request_id, "Replaying stored response");
        metrics::record_idempotency("replay");
        return replay_response(body);
    }

    // We hold the pending marker; the handler runs exactly once for this key.
    metrics::record_idempotency("execute");
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    match axum::body::to_bytes(body, MAX_CAPTURED_BODY).await {
        Ok(bytes) => {
            store.complete(&key, bytes.clone());
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(error) => {
            store.abort(&key);
            tracing::error!(key = %key, error = %error, "Failed to capture response body");
            Problem::from_error(&GatewayError::ResponseCapture, &context).into_response()
        }
    }
}

/// Resolve the key to a stored body, or win the right to execute.
///
/// Returns `Some(body)` to replay, `None` when this request is the winner
/// and must run the handler.
async fn claim(store: &IdempotencyStore, key: &str) -> Option<Bytes> {
    loop {
        let notify = match store.begin(key) {
            Begin::Replay(body) => return Some(body),
            Begin::Execute => return None,
            Begin::Wait(notify) => notify,
        };

        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        // The winner may have finished between the claim and the
        // registration above; waiting now would miss its wake-up.
        match store.snapshot(key) {
            Some(Entry::Completed(body)) => return Some(body),
            Some(Entry::Pending(current)) if Arc::ptr_eq(&current, &notify) => {
                notified.await;
            }
            // Aborted or superseded by a new winner; race again.
            _ => {}
        }
    }
}

fn replay_response(body: Bytes) -> Response {
    (StatusCode::OK, body).into_response()
}
