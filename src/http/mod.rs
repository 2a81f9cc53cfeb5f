//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, pipeline ordering)
//!     → request.rs (request ID header + extension)
//!     → admission middleware (reject over-limit early)
//!     → idempotency middleware (guarded routes only)
//!     → handlers.rs (send via resilience executor / receive)
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
