//! Gateway binary entry point.
//!
//! ```text
//!                        ┌────────────────────────────────────────────┐
//!                        │                 GATEWAY                     │
//!                        │                                             │
//!   Client Request       │  ┌──────────┐   ┌─────────────┐            │
//!   ─────────────────────┼─▶│admission │──▶│ idempotency │──┐         │
//!                        │  │controller│   │    cache    │  │         │
//!                        │  └──────────┘   └─────────────┘  ▼         │
//!                        │                           ┌────────────┐   │
//!                        │                           │  handler   │   │
//!                        │                           └─────┬──────┘   │
//!                        │                                 ▼          │
//!                        │  ┌──────────────┐   ┌────────────────┐     │
//!   Client Response      │  │  resilience  │──▶│   dispatcher   │─────┼──▶ Broker
//!   ◀────────────────────┼──│   executor   │   │ (single queue) │     │
//!                        │  └──────────────┘   └────────────────┘     │
//!                        └────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use queue_gateway::config::{load_config, GatewayConfig};
use queue_gateway::dispatch::AmqpDispatcher;
use queue_gateway::http::GatewayServer;
use queue_gateway::lifecycle::Shutdown;
use queue_gateway::observability::metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "queue_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("queue-gateway v0.1.0 starting");

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => GatewayConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        queue = %config.broker.queue,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        "Listening for connections"
    );

    let queue = AmqpDispatcher::connect(&config.broker).await?;

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config, Arc::new(queue));
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
