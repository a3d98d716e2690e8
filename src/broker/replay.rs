//! File-replay channel: feeds a detector a recorded payload stream, one line
//! per message, for deterministic offline runs. Publish is not supported.

use std::path::Path;

use async_trait::async_trait;

use super::{Delivery, MessageChannel, MessageStream};
use crate::errors::BrokerError;

pub struct ReplayChannel {
    queue: String,
    payloads: Vec<String>,
}

impl ReplayChannel {
    pub fn from_file(queue: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_lines(
            queue,
            contents.lines().map(str::to_string).collect(),
        ))
    }

    pub fn from_lines(queue: impl Into<String>, payloads: Vec<String>) -> Self {
        Self {
            queue: queue.into(),
            payloads,
        }
    }
}

#[async_trait]
impl MessageChannel for ReplayChannel {
    fn queue(&self) -> &str {
        &self.queue
    }

    async fn publish(&self, _payload: &[u8]) -> Result<(), BrokerError> {
        Err(BrokerError::Unsupported {
            operation: "publish to a replay channel",
        })
    }

    async fn subscribe(&self) -> Result<Box<dyn MessageStream>, BrokerError> {
        Ok(Box::new(ReplayStream {
            payloads: self.payloads.clone().into_iter(),
            next_tag: 1,
        }))
    }
}

pub struct ReplayStream {
    payloads: std::vec::IntoIter<String>,
    next_tag: u64,
}

#[async_trait]
impl MessageStream for ReplayStream {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, BrokerError> {
        match self.payloads.next() {
            Some(line) => {
                let tag = self.next_tag;
                self.next_tag += 1;
                Ok(Some(Delivery {
                    tag,
                    payload: line.into_bytes(),
                }))
            }
            None => Ok(None),
        }
    }

    async fn ack(&mut self, _tag: u64) -> Result<(), BrokerError> {
        Ok(())
    }
}
