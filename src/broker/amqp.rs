//! AMQP-backed channels. The broker itself stays external; this module only
//! speaks its protocol: durable queue declare, persistent publishes, manual
//! per-message acks.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties};
use tracing::info;

use super::{Broker, Delivery, MessageChannel, MessageStream};
use crate::errors::BrokerError;

/// Persistent delivery mode, so messages survive a broker restart.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

pub struct AmqpBroker {
    conn: Connection,
}

impl AmqpBroker {
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let conn = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| BrokerError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        info!(url, "Connected to broker");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn open(&self, queue: &str) -> Result<Arc<dyn MessageChannel>, BrokerError> {
        let channel = self
            .conn
            .create_channel()
            .await
            .map_err(|e| BrokerError::Open {
                queue: queue.to_string(),
                message: e.to_string(),
            })?;
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Open {
                queue: queue.to_string(),
                message: e.to_string(),
            })?;
        Ok(Arc::new(AmqpChannel {
            queue: queue.to_string(),
            channel,
        }))
    }
}

pub struct AmqpChannel {
    queue: String,
    channel: lapin::Channel,
}

#[async_trait]
impl MessageChannel for AmqpChannel {
    fn queue(&self) -> &str {
        &self.queue
    }

    async fn publish(&self, payload: &[u8]) -> Result<(), BrokerError> {
        let publish_err = |e: lapin::Error| BrokerError::Publish {
            queue: self.queue.clone(),
            message: e.to_string(),
        };
        self.channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(DELIVERY_MODE_PERSISTENT),
            )
            .await
            .map_err(publish_err)?
            .await
            .map_err(publish_err)?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn MessageStream>, BrokerError> {
        let consumer = self
            .channel
            .basic_consume(
                &self.queue,
                "smokewatch",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume {
                queue: self.queue.clone(),
                message: e.to_string(),
            })?;
        Ok(Box::new(AmqpStream {
            queue: self.queue.clone(),
            channel: self.channel.clone(),
            consumer,
        }))
    }
}

pub struct AmqpStream {
    queue: String,
    channel: lapin::Channel,
    consumer: lapin::Consumer,
}

#[async_trait]
impl MessageStream for AmqpStream {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, BrokerError> {
        match self.consumer.next().await {
            Some(Ok(delivery)) => Ok(Some(Delivery {
                tag: delivery.delivery_tag,
                payload: delivery.data,
            })),
            Some(Err(e)) => Err(BrokerError::Consume {
                queue: self.queue.clone(),
                message: e.to_string(),
            }),
            None => Ok(None),
        }
    }

    async fn ack(&mut self, tag: u64) -> Result<(), BrokerError> {
        self.channel
            .basic_ack(tag, BasicAckOptions::default())
            .await
            .map_err(|e| BrokerError::Ack {
                queue: self.queue.clone(),
                tag,
                message: e.to_string(),
            })
    }
}
