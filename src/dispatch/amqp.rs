//! AMQP-backed dispatcher.

use async_trait::async_trait;
use lapin::options::{BasicGetOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};

use crate::config::BrokerConfig;
use crate::dispatch::{BrokerError, MessageQueue};

/// Client for one named queue over a process-lifetime connection.
///
/// The queue is declared non-durable, non-exclusive, with auto-delete
/// disabled and no dead-lettering; these are constants of the deployment,
/// not runtime-negotiated. Channel-level thread safety is the client
/// library's guarantee; this type adds no locking of its own.
pub struct AmqpDispatcher {
    // Held so the connection outlives the channel it carries.
    _connection: Connection,
    channel: Channel,
    queue: String,
}

impl AmqpDispatcher {
    /// Connect, open the channel, and declare the queue.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let connection =
            Connection::connect(&config.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        channel
            .queue_declare(
                &config.queue,
                QueueDeclareOptions {
                    durable: false,
                    exclusive: false,
                    auto_delete: false,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        tracing::info!(queue = %config.queue, "Connected to message broker");

        Ok(Self {
            _connection: connection,
            channel,
            queue: config.queue.clone(),
        })
    }
}

#[async_trait]
impl MessageQueue for AmqpDispatcher {
    async fn send(&self, body: &[u8]) -> Result<(), BrokerError> {
        self.channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default(),
            )
            .await?
            .await?;
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Vec<u8>>, BrokerError> {
        let message = self
            .channel
            .basic_get(&self.queue, BasicGetOptions { no_ack: true })
            .await?;
        Ok(message.map(|delivered| delivered.delivery.data))
    }
}
