//! Fixed-window limiter with a bounded FIFO wait queue.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::admission::Admission;

/// Counts admissions per discrete time window.
///
/// Requests beyond the permit count wait in a bounded queue and are
/// released oldest-first when the window rolls; beyond queue capacity they
/// are rejected outright. Window state is wall-clock driven and rolled
/// lazily on access, so an idle partition still resets on schedule.
pub struct FixedWindow {
    permit_limit: u32,
    queue_limit: usize,
    window: Duration,
    state: Mutex<WindowState>,
}

struct WindowState {
    window_start: Instant,
    admitted: u32,
    queue: VecDeque<oneshot::Sender<()>>,
}

impl FixedWindow {
    pub fn new(permit_limit: u32, queue_limit: usize, window: Duration) -> Self {
        Self {
            permit_limit,
            queue_limit,
            window,
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                admitted: 0,
                queue: VecDeque::new(),
            }),
        }
    }

    /// Acquire a permit, waiting in the queue if the window is exhausted.
    ///
    /// Cancellation-safe: dropping the returned future vacates the queue
    /// slot without consuming a permit.
    pub async fn acquire(&self) -> Admission {
        let mut grant = {
            let mut state = self.state.lock().expect("fixed window mutex poisoned");
            self.roll(&mut state);

            if state.admitted < self.permit_limit {
                state.admitted += 1;
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
                let state = self.state.lock().expect("fixed window mutex poisoned");
                state.window_start + self.window
            };
            tokio::select! {
                granted = &mut grant => {
                    // A dropped sender means the queue discarded this slot.
                    return if granted.is_ok() {
                        Admission::Admitted
                    } else {
                        Admission::Rejected
                    };
                }
                _ = tokio::time::sleep_until(wakeup) => {
                    let mut state = self.state.lock().expect("fixed window mutex poisoned");
                    self.roll(&mut state);
                    // Our grant may have been delivered by this roll; the
                    // next loop iteration observes it.
                }
            }
        }
    }

    /// Advance the window to the present and release queued waiters
    /// oldest-first into the fresh permit budget.
    fn roll(&self, state: &mut WindowState) {
        let now = Instant::now();
        while now.duration_since(state.window_start) >= self.window {
            state.window_start += self.window;
            state.admitted = 0;
            while state.admitted < self.permit_limit {
                match state.queue.pop_front() {
                    // A failed send means the waiter gave up; its permit
                    // stays available.
                    Some(tx) => {
                        if tx.send(()).is_ok() {
                            state.admitted += 1;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}
