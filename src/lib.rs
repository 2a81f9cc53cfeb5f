//! HTTP gateway in front of a message broker.
//!
//! Inbound requests pass a per-process admission controller, an opt-in
//! idempotency cache, and a retry/timeout executor before anything
//! reaches the queue.

pub mod admission;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod idempotency;
pub mod lifecycle;
pub mod observability;
pub mod problem;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
