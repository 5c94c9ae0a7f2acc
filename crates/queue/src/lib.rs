//! Broker adapters for the link queue.
//!
//! The dispatcher publishes one message per shared link through a
//! [`Publisher`]; the matching worker-side adapter must be able to invert each
//! backend's envelope back into an `UnfurlRequest`.

pub mod auth;
pub mod error;
pub mod memory;
pub mod pubsub;
pub mod sigv4;
pub mod sns;

use std::sync::Arc;

use {async_trait::async_trait, unfurler_config::QueueConfig};

pub use {
    error::{Error, Result},
    memory::{Delivery, MemoryConsumer, MemoryPublisher},
    pubsub::PubSubPublisher,
    sns::SnsPublisher,
};

/// Publish capability shared by every broker backend.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    /// Publish one link. Returns the broker-assigned message id.
    async fn publish(&self, link: &str, ts: &str, channel: &str) -> Result<String>;
}

/// Publisher built from config, plus the in-process consumer when the
/// backend is the memory queue.
pub struct QueueHandle {
    pub publisher: Arc<dyn Publisher>,
    pub consumer: Option<MemoryConsumer>,
}

/// Build the configured backend. Called once at startup; the returned
/// publisher is shared by every dispatcher invocation.
pub fn from_config(config: &QueueConfig, http: reqwest::Client) -> Result<QueueHandle> {
    let handle = match config {
        QueueConfig::Memory { capacity } => {
            let (publisher, consumer) = memory::channel(*capacity);
            QueueHandle {
                publisher: Arc::new(publisher),
                consumer: Some(consumer),
            }
        },
        QueueConfig::PubSub(cfg) => QueueHandle {
            publisher: Arc::new(PubSubPublisher::new(http, cfg)),
            consumer: None,
        },
        QueueConfig::Sns(cfg) => QueueHandle {
            publisher: Arc::new(SnsPublisher::new(http, cfg)?),
            consumer: None,
        },
    };
    Ok(handle)
}
