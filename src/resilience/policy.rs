//! Resilience policy configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ResilienceConfig;

/// Backoff shape between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    #[default]
    Exponential,
    /// `base_delay` between every pair of attempts.
    Constant,
}

/// Immutable retry/timeout policy shared by all invocations of a pipeline.
///
/// The executor keeps no state of its own; every `execute` call gets an
/// independent attempt counter from this shared configuration.
#[derive(Debug, Clone)]
pub struct ResiliencePolicy {
    /// Retry attempts after the first failure.
    pub max_retries: u32,

    /// Base delay between attempts.
    pub base_delay: Duration,

    /// Cap on any single delay.
    pub max_delay: Duration,

    /// Backoff shape.
    pub backoff: Backoff,

    /// Randomize delays to spread synchronized retries.
    pub jitter: bool,

    /// Bound on the entire call, all attempts and delays combined.
    pub timeout: Duration,
}

impl ResiliencePolicy {
    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff: config.backoff,
            jitter: config.jitter,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}
