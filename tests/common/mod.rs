//! Shared utilities for pipeline integration tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use queue_gateway::config::GatewayConfig;
use queue_gateway::dispatch::{BrokerError, MessageQueue};
use queue_gateway::http::GatewayServer;
use queue_gateway::lifecycle::Shutdown;

/// In-memory queue with scriptable send failures.
///
/// Stands in for the broker so tests exercise the full pipeline without a
/// running AMQP server.
#[derive(Default)]
pub struct InMemoryQueue {
    messages: Mutex<VecDeque<Vec<u8>>>,
    send_attempts: AtomicU32,
    failures_remaining: AtomicU32,
    send_delay_ms: AtomicU32,
}

impl InMemoryQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `n` sends with a broker fault before succeeding.
    pub fn fail_next_sends(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Total send attempts observed, including failed ones.
    pub fn send_attempts(&self) -> u32 {
        self.send_attempts.load(Ordering::SeqCst)
    }

    /// Messages currently sitting in the queue.
    pub fn depth(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Hold every send for `ms` so tests can force request overlap.
    pub fn delay_sends(&self, ms: u32) {
        self.send_delay_ms.store(ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send(&self, body: &[u8]) -> Result<(), BrokerError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = self.send_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(u64::from(delay))).await;
        }
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BrokerError::Unavailable("scripted failure".to_string()));
        }
        self.messages.lock().unwrap().push_back(body.to_vec());
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Vec<u8>>, BrokerError> {
        Ok(self.messages.lock().unwrap().pop_front())
    }
}

/// Boot a gateway on an ephemeral port; returns its address and the
/// shutdown handle keeping it alive.
pub async fn start_gateway(config: GatewayConfig, queue: Arc<InMemoryQueue>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config, queue);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// Config with limits high enough to stay out of the way of
/// non-admission tests.
pub fn permissive_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.admission.global_window.permit_limit = 1000;
    config.admission.token_bucket.capacity = 1000;
    config.admission.per_client.permit_limit = 1000;
    config.resilience.base_delay_ms = 10;
    config.resilience.max_delay_ms = 50;
    config.resilience.timeout_secs = 5;
    config
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
