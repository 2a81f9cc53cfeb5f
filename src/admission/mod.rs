//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → middleware.rs (client address, 429 on rejection)
//!     → controller.rs (all policies must admit)
//!         → fixed_window.rs (global window, per-client partitions)
//!         → token_bucket.rs (global burst budget)
//! ```
//!
//! # Design Decisions
//! - Per-process state only; no coordination across instances
//! - Queue waits happen inside `admit`, so callers observe only
//!   admitted/rejected
//! - Windows and buckets are wall-clock driven, rolled lazily on access

pub mod controller;
pub mod fixed_window;
pub mod middleware;
pub mod token_bucket;

pub use controller::{AdmissionController, Rejection};
pub use middleware::admission_middleware;

/// Outcome of one limiter's acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected,
}
