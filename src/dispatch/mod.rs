//! Message dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Handler:
//!     → resilience executor (retry/timeout)
//!     → MessageQueue::send / receive
//!     → amqp.rs (one connection, one channel, one named queue)
//! ```
//!
//! # Design Decisions
//! - The channel is an owned resource behind a trait seam; callers never
//!   touch the client directly
//! - Fire-and-forget publish: success means the broker accepted the
//!   message, not that anyone consumed it
//! - Non-blocking pull with immediate ack: at-most-once from this
//!   consumer's perspective
//! - No internal retries, ordering, or transactions; retry is layered
//!   above by the executor

pub mod amqp;

pub use amqp::AmqpDispatcher;

use async_trait::async_trait;
use thiserror::Error;

/// Fault raised by the broker client.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Producer/consumer access to a single named queue.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Publish one message. Resolves once the broker accepts it.
    async fn send(&self, body: &[u8]) -> Result<(), BrokerError>;

    /// Pull the oldest available message, acknowledging it immediately.
    /// Returns `None` when the queue is empty; never blocks on an empty
    /// queue.
    async fn receive(&self) -> Result<Option<Vec<u8>>, BrokerError>;
}
