//! Composition of the active admission policies.

use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::admission::fixed_window::FixedWindow;
use crate::admission::token_bucket::TokenBucket;
use crate::admission::Admission;
use crate::config::{AdmissionConfig, FixedWindowConfig};

/// Which policy turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub policy: &'static str,
}

/// Decides whether a request proceeds before any business logic runs.
///
/// Every configured policy must individually admit the request; failing
/// any one of them rejects it. Per-client partitions are created on first
/// sight of an address and live for the process lifetime.
pub struct AdmissionController {
    enabled: bool,
    global_window: FixedWindow,
    token_bucket: TokenBucket,
    per_client: DashMap<IpAddr, Arc<FixedWindow>>,
    per_client_config: FixedWindowConfig,
}

impl AdmissionController {
    pub fn from_config(config: &AdmissionConfig) -> Self {
        let gw = config.global_window;
        let tb = config.token_bucket;
        Self {
            enabled: config.enabled,
            global_window: FixedWindow::new(
                gw.permit_limit,
                gw.queue_limit,
                Duration::from_secs(gw.window_secs),
            ),
            token_bucket: TokenBucket::new(
                tb.capacity,
                tb.refill_amount,
                Duration::from_secs(tb.refill_period_secs),
                tb.queue_limit,
            ),
            per_client: DashMap::new(),
            per_client_config: config.per_client,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Admit or reject a request from `client`.
    ///
    /// May suspend while a policy queues the request; queue waits die with
    /// the caller's future, so a timed-out request vacates its slot.
    pub async fn admit(&self, client: IpAddr) -> Result<(), Rejection> {
        if self.global_window.acquire().await == Admission::Rejected {
            return Err(Rejection {
                policy: "global_fixed_window",
            });
        }
        if self.token_bucket.acquire().await == Admission::Rejected {
            return Err(Rejection {
                policy: "global_token_bucket",
            });
        }

        let partition = {
            let entry = self.per_client.entry(client).or_insert_with(|| {
                Arc::new(FixedWindow::new(
                    self.per_client_config.permit_limit,
                    self.per_client_config.queue_limit,
                    Duration::from_secs(self.per_client_config.window_secs),
                ))
            });
            entry.value().clone()
        };
        if partition.acquire().await == Admission::Rejected {
            return Err(Rejection {
                policy: "per_client_fixed_window",
            });
        }
        Ok(())
    }
}
