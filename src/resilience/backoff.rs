//! Backoff delay calculation with jitter.

use rand::Rng;
use std::time::Duration;

use crate::resilience::policy::{Backoff, ResiliencePolicy};

/// Calculate the delay before the retry following `attempt` (1-based).
pub fn retry_delay(attempt: u32, policy: &ResiliencePolicy) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let base_ms = policy.base_delay.as_millis() as u64;
    let max_ms = policy.max_delay.as_millis() as u64;

    let delay_ms = match policy.backoff {
        Backoff::Constant => base_ms,
        Backoff::Exponential => {
            let exponential_base = 2u64.saturating_pow(attempt - 1);
            base_ms.saturating_mul(exponential_base)
        }
    };
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if policy.jitter && jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
