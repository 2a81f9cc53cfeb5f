//! Idempotency subsystem.
//!
//! # Data Flow
//! ```text
//! Guarded request:
//!     → middleware.rs (extract key, claim or replay)
//!     → store.rs (pending/completed state per key)
//!     → handler runs once; body buffered and committed
//!     → retries replay the stored body verbatim
//! ```
//!
//! # Design Decisions
//! - Shared process-global store; no per-entry expiry
//! - Per-key check-and-set, never a global lock
//! - Losers of the first-sight race wait for the winner's result

pub mod middleware;
pub mod store;

pub use middleware::{idempotency_middleware, IDEMPOTENCY_KEY};
pub use store::IdempotencyStore;
