//! Token-bucket limiter with a bounded FIFO wait queue.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::admission::Admission;

/// Allows bursts up to a refillable capacity.
///
/// Tokens accrue continuously at the configured rate and are spent one per
/// admission. An empty bucket queues waiters (bounded, oldest-first); a
/// full queue rejects. Refill is wall-clock driven and applied lazily on
/// access.
pub struct TokenBucket {
    capacity: f64,
    /// Tokens per second.
    refill_rate: f64,
    queue_limit: usize,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_update: Instant,
    queue: VecDeque<oneshot::Sender<()>>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_amount: u32, refill_period: Duration, queue_limit: usize) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_rate: f64::from(refill_amount) / refill_period.as_secs_f64(),
            queue_limit,
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_update: Instant::now(),
                queue: VecDeque::new(),
            }),
        }
    }

    /// Take one token, waiting in the queue while the bucket refills.
    pub async fn acquire(&self) -> Admission {
        let mut grant = {
            let mut state = self.state.lock().expect("token bucket mutex poisoned");
            self.refill(&mut state);

            // After refill the queue is only non-empty when tokens < 1,
            // so taking the fast path here cannot jump the line.
            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                return Admission::Admitted;
            }
            if state.queue.len() >= self.queue_limit {
                return Admission::Rejected;
            }
            let (tx, rx) = oneshot::channel();
            state.queue.push_back(tx);
            rx
        };

        loop {
            let wakeup = {
                let state = self.state.lock().expect("token bucket mutex poisoned");
                let deficit = (1.0 - state.tokens).max(0.0);
                state.last_update + Duration::from_secs_f64(deficit / self.refill_rate)
            };
            tokio::select! {
                granted = &mut grant => {
                    return if granted.is_ok() {
                        Admission::Admitted
                    } else {
                        Admission::Rejected
                    };
                }
                _ = tokio::time::sleep_until(wakeup) => {
                    let mut state = self.state.lock().expect("token bucket mutex poisoned");
                    self.refill(&mut state);
                }
            }
        }
    }

    /// Accrue tokens for the elapsed time and hand them to queued waiters
    /// oldest-first.
    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_update = now;

        while state.tokens >= 1.0 {
            match state.queue.pop_front() {
                Some(tx) => {
                    if tx.send(()).is_ok() {
                        state.tokens -= 1.0;
                    }
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_up_to_capacity_then_reject() {
        let bucket = TokenBucket::new(3, 1, Duration::from_secs(60), 0);
        for _ in 0..3 {
            assert_eq!(bucket.acquire().await, Admission::Admitted);
        }
        assert_eq!(bucket.acquire().await, Admission::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_waiter_released_as_tokens_accrue() {
        let bucket = std::sync::Arc::new(TokenBucket::new(1, 1, Duration::from_secs(1), 1));
        assert_eq!(bucket.acquire().await, Admission::Admitted);

        let queued = {
            let bucket = bucket.clone();
            tokio::spawn(async move { bucket.acquire().await })
        };
        tokio::task::yield_now().await;

        let start = Instant::now();
        assert_eq!(queued.await.unwrap(), Admission::Admitted);
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn refill_never_exceeds_capacity() {
        let bucket = TokenBucket::new(2, 10, Duration::from_secs(1), 0);
        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(bucket.acquire().await, Admission::Admitted);
        assert_eq!(bucket.acquire().await, Admission::Admitted);
        assert_eq!(bucket.acquire().await, Admission::Rejected);
    }
}
