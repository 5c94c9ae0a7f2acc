//! Translations between hosting-platform invocation shapes and
//! [`CallbackRequest`](crate::CallbackRequest).
//!
//! The direct-invocation adapter lives in the gateway, which hands its own
//! method and body straight to the dispatcher.

pub mod http_event;
