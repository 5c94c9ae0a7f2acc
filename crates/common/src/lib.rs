//! Message types and secret serde helpers shared by every unfurler crate.

pub mod secret;
pub mod types;

pub use types::{QueuedLinkMessage, UnfurlRequest};
