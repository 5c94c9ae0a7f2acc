//! Slack Events API callback dispatcher.
//!
//! Verifies each inbound callback, routes it over the closed set of callback
//! and event kinds, and publishes one queue message per shared link. Platform
//! adapters translate their native invocation shape into [`CallbackRequest`]
//! and read the outcome back from a [`Responder`].

pub mod adapters;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod request;

pub use {
    dispatcher::Dispatcher,
    error::{CallbackError, DispatchError},
    events::{CallbackKind, EventKind, LinkSharedEvent, SharedLink},
    request::{CallbackRequest, Responder, ResponseBody, ResponseRecorder},
};
