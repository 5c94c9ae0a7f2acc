//! Broker delivery shapes translated into [`UnfurlRequest`].
//!
//! Adapters never fail: missing attributes become `None` fields and are
//! dealt with by the worker.

pub mod pubsub;
pub mod sns;

use {tracing::error, unfurler_common::UnfurlRequest};

use crate::{
    error::Result,
    worker::{UnfurlOutcome, UnfurlWorker},
};

/// Run a batch of requests one after another, stopping at the first
/// failure so the host redelivers the whole batch.
pub async fn run_sequential(
    worker: &UnfurlWorker,
    requests: &[UnfurlRequest],
) -> Result<Vec<UnfurlOutcome>> {
    let mut outcomes = Vec::with_capacity(requests.len());
    for request in requests {
        match worker.unfurl(request).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(message_id = request.message_id_or_unknown(), error = %e, "unfurl failed");
                return Err(e);
            },
        }
    }
    Ok(outcomes)
}
