//! In-process queue backed by a bounded tokio channel.
//!
//! Used by `unfurler serve` when no external broker is configured: the
//! gateway drains the consumer and hands each delivery to the worker.

use {
    async_trait::async_trait,
    tokio::sync::mpsc,
    tracing::info,
    unfurler_common::{QueuedLinkMessage, UnfurlRequest},
};

use crate::{Error, Publisher, Result};

const BACKEND: &str = "memory";

/// One message taken off the memory queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    pub message: QueuedLinkMessage,
}

impl From<Delivery> for UnfurlRequest {
    fn from(delivery: Delivery) -> Self {
        delivery.message.into_request(delivery.message_id)
    }
}

/// Create a connected publisher/consumer pair. A zero capacity is bumped to
/// one.
#[must_use]
pub fn channel(capacity: usize) -> (MemoryPublisher, MemoryConsumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MemoryPublisher { tx }, MemoryConsumer { rx })
}

#[derive(Clone)]
pub struct MemoryPublisher {
    tx: mpsc::Sender<Delivery>,
}

#[async_trait]
impl Publisher for MemoryPublisher {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn publish(&self, link: &str, ts: &str, channel: &str) -> Result<String> {
        let message_id = uuid::Uuid::new_v4().to_string();
        let delivery = Delivery {
            message_id: message_id.clone(),
            message: QueuedLinkMessage::new(link, ts, channel),
        };
        self.tx.send(delivery).await.map_err(|_| Error::Closed)?;
        info!(backend = BACKEND, message_id = %message_id, link, channel, ts, "posted link");
        Ok(message_id)
    }
}

pub struct MemoryConsumer {
    rx: mpsc::Receiver<Delivery>,
}

impl MemoryConsumer {
    /// Next delivery, or `None` once every publisher has been dropped.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}
