//! In-process consumer for the memory queue.

use {
    tokio::task::JoinHandle,
    tracing::{error, info},
    unfurler_queue::MemoryConsumer,
    unfurler_worker::{UnfurlRequest, UnfurlWorker},
};

/// Drain `consumer` in the background, running the worker on each delivery
/// one at a time. Failures are logged and the delivery is dropped; the
/// memory queue has no redelivery. The task ends when every publisher is
/// gone.
pub fn spawn_consumer(mut consumer: MemoryConsumer, worker: UnfurlWorker) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(delivery) = consumer.recv().await {
            let request = UnfurlRequest::from(delivery);
            if let Err(e) = worker.unfurl(&request).await {
                error!(
                    message_id = request.message_id_or_unknown(),
                    error = %e,
                    "unfurl failed"
                );
            }
        }
        info!("memory queue closed, consumer stopping");
    })
}
