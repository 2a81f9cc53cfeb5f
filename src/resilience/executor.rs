//! Generic retry/timeout execution.
//!
//! # Responsibilities
//! - Wrap an arbitrary async operation with bounded retries
//! - Enforce one wall-clock deadline over all attempts combined
//! - Surface the last fault after exhaustion
//!
//! # Design Decisions
//! - Pure higher-order wrapper; no trait hierarchy, no per-executor state
//! - The base policy treats every fault as retryable
//! - Timeout wins over remaining attempts

use std::fmt;
use std::future::Future;
use thiserror::Error;

use crate::resilience::backoff::retry_delay;
use crate::resilience::policy::ResiliencePolicy;

/// Terminal failure of an `execute` call.
#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    /// The policy timeout elapsed before any attempt succeeded.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Every attempt failed; carries the last underlying fault.
    #[error("retry attempts exhausted: {0}")]
    Exhausted(E),
}

/// Run `operation` under `policy`, retrying faults with backoff.
///
/// The operation is invoked up to `1 + max_retries` times. The policy
/// timeout bounds the whole call; hitting it aborts even if attempts
/// remain. Reentrant: concurrent callers sharing one policy get
/// independent attempt counters.
pub async fn execute<T, E, F, Fut>(
    policy: &ResiliencePolicy,
    mut operation: F,
) -> Result<T, ExecuteError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let total_attempts = policy.max_retries.saturating_add(1);

    let attempts = async {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(fault) => {
                    if attempt >= total_attempts {
                        return Err(fault);
                    }
                    let delay = retry_delay(attempt, policy);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %fault,
                        "operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    };

    match tokio::time::timeout(policy.timeout, attempts).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(fault)) => Err(ExecuteError::Exhausted(fault)),
        Err(_) => Err(ExecuteError::Timeout(policy.timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::policy::Backoff;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn policy() -> ResiliencePolicy {
        ResiliencePolicy {
            max_retries: 2,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential,
            jitter: false,
            timeout: Duration::from_secs(25),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_makes_exactly_three_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = execute(&policy(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("queue unreachable")
            }
        })
        .await;

        assert!(matches!(result, Err(ExecuteError::Exhausted(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_with_exponential_gaps() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let start = Instant::now();

        let result = execute(&policy(), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient")
                } else {
                    Ok("sent")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "sent");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s after the first failure, 4s after the second.
        assert!(start.elapsed() >= Duration::from_secs(6));
        assert!(start.elapsed() < Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_wins_over_remaining_attempts() {
        let mut p = policy();
        p.max_retries = 5;
        p.timeout = Duration::from_secs(5);

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        // Would succeed on the third attempt, but the cumulative delay
        // (2s + 4s) crosses the 5s deadline first.
        let result = execute(&p, || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient")
                } else {
                    Ok("sent")
                }
            }
        })
        .await;

        assert!(matches!(result, Err(ExecuteError::Timeout(_))));
    }

    #[tokio::test]
    async fn first_attempt_success_skips_backoff() {
        let result = execute(&policy(), || async { Ok::<_, String>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
