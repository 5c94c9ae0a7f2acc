//! HTTP host for the dispatcher and the worker.
//!
//! Serves the Slack Events API callback route, a Pub/Sub push endpoint, and,
//! when the in-memory queue is configured, drains it in-process.

pub mod consumer;
pub mod server;

pub use {
    consumer::spawn_consumer,
    server::{AppState, build_app, start_gateway},
};
