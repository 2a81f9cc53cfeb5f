//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the message endpoints
//! - Order the pipeline: request ID → trace → timeout → admission →
//!   idempotency (guarded routes) → handler
//! - Bind the server to a listener and drain gracefully on shutdown
//!
//! # Design Decisions
//! - The idempotency layer guards only the send route; reads are exempt
//! - Admission runs before the idempotency cache, so a rejected request
//!   touches neither the store nor the broker
//! - The broker is injected behind its trait, so tests run the full
//!   pipeline against an in-memory queue

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admission::{admission_middleware, AdmissionController};
use crate::config::GatewayConfig;
use crate::dispatch::MessageQueue;
use crate::http::handlers::{receive_message, send_message};
use crate::http::request::RequestIdLayer;
use crate::idempotency::{idempotency_middleware, IdempotencyStore};
use crate::lifecycle::shutdown;
use crate::resilience::ResiliencePolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn MessageQueue>,
    pub policy: ResiliencePolicy,
    pub idempotency: IdempotencyStore,
    pub admission: Arc<AdmissionController>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a new server over the given queue client.
    pub fn new(config: GatewayConfig, queue: Arc<dyn MessageQueue>) -> Self {
        let state = AppState {
            queue,
            policy: ResiliencePolicy::from_config(&config.resilience),
            idempotency: IdempotencyStore::new(),
            admission: Arc::new(AdmissionController::from_config(&config.admission)),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let guarded = Router::new()
            .route("/api/messages", post(send_message))
            .route_layer(middleware::from_fn_with_state(
                state.idempotency.clone(),
                idempotency_middleware,
            ));
        let open = Router::new().route("/api/messages", get(receive_message));

        guarded
            .merge(open)
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(
                state.admission.clone(),
                admission_middleware,
            ))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_rx.recv() => {}
                    _ = shutdown::signal() => {}
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
