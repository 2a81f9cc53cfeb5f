//! Admission middleware.
//!
//! Runs before any business logic; a rejected request never reaches the
//! idempotency layer or the handler.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::admission::AdmissionController;
use crate::observability::metrics;
use crate::problem::{GatewayError, Problem, ProblemContext};

pub async fn admission_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(controller): State<Arc<AdmissionController>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !controller.enabled() {
        return next.run(request).await;
    }

    match controller.admit(addr.ip()).await {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            let context = ProblemContext::of(&request);
            tracing::warn!(
                client = %addr.ip(),
                policy = rejection.policy,
                request_id = %context.request_id,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(rejection.policy);
            Problem::from_error(&GatewayError::NotAdmitted, &context).into_response()
        }
    }
}
