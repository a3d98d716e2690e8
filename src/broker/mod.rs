pub mod amqp;
pub mod memory;
pub mod replay;

pub use amqp::AmqpBroker;
pub use memory::MemoryBroker;
pub use replay::ReplayChannel;

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::BrokerError;

/// One message as handed to a consumer. The tag is only meaningful to the
/// stream that delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub tag: u64,
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Connection-level handle to the broker. Opening a queue that cannot be
/// reached is a fatal setup error for the caller.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn open(&self, queue: &str) -> Result<Arc<dyn MessageChannel>, BrokerError>;
}

/// A named, ordered, durable delivery path for one sensor's readings.
///
/// This is the only surface the producer and detectors see; it can be backed
/// by a real broker, the in-memory double, or a file-replay harness.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    fn queue(&self) -> &str;

    async fn publish(&self, payload: &[u8]) -> Result<(), BrokerError>;

    async fn subscribe(&self) -> Result<Box<dyn MessageStream>, BrokerError>;
}

/// Consumer side of a channel. Deliveries arrive strictly in queue order and
/// must be acked after processing; anything left unacked is redelivered.
#[async_trait]
pub trait MessageStream: Send {
    /// Waits for the next message. `None` means the stream is exhausted
    /// (replay harness) — broker-backed streams block indefinitely.
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, BrokerError>;

    async fn ack(&mut self, tag: u64) -> Result<(), BrokerError>;
}
