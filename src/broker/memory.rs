//! In-process broker double with the same delivery contract as the real one:
//! ordered queues, explicit acks, redelivery of anything a dropped consumer
//! left unacked. Used by the single-process `run` mode and the test suite.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

use super::{Broker, Delivery, MessageChannel, MessageStream};
use crate::errors::BrokerError;

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Delivery>,
    unacked: HashMap<u64, Vec<u8>>,
    next_tag: u64,
}

struct QueueInner {
    state: Mutex<QueueState>,
    available: Notify,
}

impl QueueInner {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            available: Notify::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    queues: Arc<Mutex<HashMap<String, Arc<QueueInner>>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue_inner(&self, name: &str) -> Arc<QueueInner> {
        let mut queues = self.queues.lock().unwrap();
        queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(QueueInner::new()))
            .clone()
    }

    /// True once every queue has no ready and no unacked messages. The `run`
    /// mode polls this to know when the detectors have caught up.
    pub fn drained(&self) -> bool {
        let queues = self.queues.lock().unwrap();
        queues.values().all(|q| {
            let state = q.state.lock().unwrap();
            state.ready.is_empty() && state.unacked.is_empty()
        })
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn open(&self, queue: &str) -> Result<Arc<dyn MessageChannel>, BrokerError> {
        Ok(Arc::new(MemoryChannel {
            name: queue.to_string(),
            inner: self.queue_inner(queue),
        }))
    }
}

pub struct MemoryChannel {
    name: String,
    inner: Arc<QueueInner>,
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    fn queue(&self) -> &str {
        &self.name
    }

    async fn publish(&self, payload: &[u8]) -> Result<(), BrokerError> {
        {
            let mut state = self.inner.state.lock().unwrap();
            let tag = state.next_tag;
            state.next_tag += 1;
            state.ready.push_back(Delivery {
                tag,
                payload: payload.to_vec(),
            });
        }
        self.inner.available.notify_one();
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn MessageStream>, BrokerError> {
        Ok(Box::new(MemoryStream {
            name: self.name.clone(),
            inner: self.inner.clone(),
        }))
    }
}

pub struct MemoryStream {
    name: String,
    inner: Arc<QueueInner>,
}

#[async_trait]
impl MessageStream for MemoryStream {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, BrokerError> {
        loop {
            let notified = self.inner.available.notified();
            {
                let mut state = self.inner.state.lock().unwrap();
                if let Some(delivery) = state.ready.pop_front() {
                    state.unacked.insert(delivery.tag, delivery.payload.clone());
                    return Ok(Some(delivery));
                }
            }
            notified.await;
        }
    }

    async fn ack(&mut self, tag: u64) -> Result<(), BrokerError> {
        let mut state = self.inner.state.lock().unwrap();
        if state.unacked.remove(&tag).is_none() {
            return Err(BrokerError::Ack {
                queue: self.name.clone(),
                tag,
                message: "unknown delivery tag".to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for MemoryStream {
    fn drop(&mut self) {
        // A consumer that dies mid-processing gets its unacked messages
        // redelivered, oldest first.
        let mut state = self.inner.state.lock().unwrap();
        if state.unacked.is_empty() {
            return;
        }
        let mut pending: Vec<(u64, Vec<u8>)> = state.unacked.drain().collect();
        pending.sort_by_key(|(tag, _)| *tag);
        for (tag, payload) in pending.into_iter().rev() {
            debug!(queue = %self.name, tag, "Requeueing unacked delivery");
            state.ready.push_front(Delivery { tag, payload });
        }
        self.inner.available.notify_one();
    }
}
