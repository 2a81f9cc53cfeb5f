//! Message endpoint handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Instant;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::problem::{GatewayError, Problem, ProblemContext};
use crate::resilience::execute;

/// Send a message to the queue.
///
/// The publish runs under the resilience policy; exhausted retries or the
/// policy timeout surface as a 400 problem, a caller-visible failure
/// rather than a gateway outage.
pub async fn send_message(
    State(state): State<AppState>,
    context: ProblemContext,
    message: String,
) -> Response {
    let start = Instant::now();

    let outcome = execute(&state.policy, || state.queue.send(message.as_bytes())).await;

    match outcome {
        Ok(()) => {
            tracing::debug!(request_id = %context.request_id, "Message accepted by broker");
            metrics::record_dispatch("sent");
            metrics::record_request("POST", 200, start);
            (
                StatusCode::OK,
                Json(json!({ "message": "Message sent successfully!" })),
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!(
                request_id = %context.request_id,
                error = %error,
                "Dispatch failed"
            );
            metrics::record_dispatch("failed");
            metrics::record_request("POST", 400, start);
            Problem::from_error(&GatewayError::DispatchFailed(error.to_string()), &context)
                .into_response()
        }
    }
}

/// Receive a message from the queue.
///
/// A fetched message is acknowledged on retrieval; an empty queue is
/// 204 No Content, not an error.
pub async fn receive_message(State(state): State<AppState>, context: ProblemContext) -> Response {
    let start = Instant::now();

    match state.queue.receive().await {
        Ok(Some(data)) => {
            let message = String::from_utf8_lossy(&data).into_owned();
            metrics::record_request("GET", 200, start);
            (StatusCode::OK, Json(json!({ "message": message }))).into_response()
        }
        Ok(None) => {
            metrics::record_request("GET", 204, start);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(error) => {
            tracing::error!(request_id = %context.request_id, error = %error, "Receive failed");
            metrics::record_request("GET", 400, start);
            Problem::from_error(&GatewayError::DispatchFailed(error.to_string()), &context)
                .into_response()
        }
    }
}
