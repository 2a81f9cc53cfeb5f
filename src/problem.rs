//! Boundary error translation.
//!
//! # Responsibilities
//! - Define the gateway fault taxonomy
//! - Convert every escalated fault into a structured problem body
//! - Enrich problems with request context (instance, request ID, trace ID)
//!
//! # Design Decisions
//! - One translator for all faults; handlers and middleware never hand-roll
//!   error bodies
//! - Clients see a message string, never fault internals
//! - Broker exhaustion maps to 400, not 5xx: an unreachable broker is a
//!   caller-visible failure of the operation, not a gateway outage

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use thiserror::Error;

use crate::http::request::RequestId;

/// Faults that escalate past the handlers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A guarded route was called without the required header.
    #[error("Idempotency-Key header is required.")]
    MissingIdempotencyKey,

    /// Request rejected by the admission controller.
    #[error("Too many requests, retry later.")]
    NotAdmitted,

    /// All dispatch attempts against the broker failed or timed out.
    #[error("Errors.{0}")]
    DispatchFailed(String),

    /// The response body could not be captured for the idempotency store.
    #[error("Failed to capture the response.")]
    ResponseCapture,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingIdempotencyKey => StatusCode::BAD_REQUEST,
            GatewayError::NotAdmitted => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::DispatchFailed(_) => StatusCode::BAD_REQUEST,
            GatewayError::ResponseCapture => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            GatewayError::MissingIdempotencyKey => "Bad Request",
            GatewayError::NotAdmitted => "Too Many Requests",
            GatewayError::DispatchFailed(_) => "Bad Request",
            GatewayError::ResponseCapture => "Internal Server Error",
        }
    }
}

/// Structured error body sent for every translated fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub detail: String,
    pub status: u16,
    pub instance: String,
    pub request_id: String,
    pub trace_id: String,
}

impl Problem {
    /// Translate a fault into its client-visible body.
    pub fn from_error(error: &GatewayError, context: &ProblemContext) -> Self {
        let status = error.status();
        Self {
            kind: problem_type(status).to_string(),
            title: error.title().to_string(),
            detail: error.to_string(),
            status: status.as_u16(),
            instance: context.instance.clone(),
            request_id: context.request_id.clone(),
            trace_id: context.trace_id(),
        }
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self),
        )
            .into_response()
    }
}

/// Request context captured for problem enrichment.
///
/// Extractable in handlers; middleware builds it directly from the request
/// before forwarding.
#[derive(Debug, Clone)]
pub struct ProblemContext {
    /// "METHOD /path" of the failing request.
    pub instance: String,
    /// Correlation ID assigned by the request-ID layer.
    pub request_id: String,
}

impl ProblemContext {
    pub fn of<B>(request: &Request<B>) -> Self {
        Self {
            instance: format!("{} {}", request.method(), request.uri().path()),
            request_id: request
                .extensions()
                .get::<RequestId>()
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }

    fn trace_id(&self) -> String {
        tracing::Span::current()
            .id()
            .map(|id| format!("{:016x}", id.into_u64()))
            .unwrap_or_else(|| self.request_id.clone())
    }
}

impl<S> FromRequestParts<S> for ProblemContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            instance: format!("{} {}", parts.method, parts.uri.path()),
            request_id: parts
                .extensions
                .get::<RequestId>()
                .map(|id| id.to_string())
                .unwrap_or_default(),
        })
    }
}

fn problem_type(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "Not Found",
        StatusCode::TOO_MANY_REQUESTS => "Too Many Requests",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
        _ => "Unknown Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ProblemContext {
        ProblemContext {
            instance: "POST /api/messages".to_string(),
            request_id: "11111111-2222-3333-4444-555555555555".to_string(),
        }
    }

    #[test]
    fn missing_key_maps_to_400() {
        let problem = Problem::from_error(&GatewayError::MissingIdempotencyKey, &context());
        assert_eq!(problem.status, 400);
        assert_eq!(problem.kind, "Bad Request");
        assert_eq!(problem.detail, "Idempotency-Key header is required.");
        assert_eq!(problem.instance, "POST /api/messages");
    }

    #[test]
    fn rejection_maps_to_429() {
        let problem = Problem::from_error(&GatewayError::NotAdmitted, &context());
        assert_eq!(problem.status, 429);
        assert_eq!(problem.kind, "Too Many Requests");
    }

    #[test]
    fn dispatch_failure_carries_message_only() {
        let err = GatewayError::DispatchFailed("queue unreachable".to_string());
        let problem = Problem::from_error(&err, &context());
        assert_eq!(problem.status, 400);
        assert_eq!(problem.detail, "Errors.queue unreachable");
    }

    #[test]
    fn serializes_camel_case() {
        let problem = Problem::from_error(&GatewayError::MissingIdempotencyKey, &context());
        let json = serde_json::to_value(&problem).unwrap();
        assert!(json.get("requestId").is_some());
        assert!(json.get("traceId").is_some());
        assert!(json.get("type").is_some());
    }
}
