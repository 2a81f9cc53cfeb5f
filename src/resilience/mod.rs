//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Handler call to the broker:
//!     → executor.rs (attempt, retry on fault, overall timeout)
//!     → backoff.rs (delay between attempts, exponential or constant)
//!     → policy.rs (shared immutable retry/timeout parameters)
//! ```
//!
//! # Design Decisions
//! - The executor is a plain generic function over the operation
//! - Retry lives here, never inside the dispatcher
//! - The overall timeout is independent of, and nested inside, the
//!   request's own deadline

pub mod backoff;
pub mod executor;
pub mod policy;

pub use executor::{execute, ExecuteError};
pub use policy::{Backoff, ResiliencePolicy};
