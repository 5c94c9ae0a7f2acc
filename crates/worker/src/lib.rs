//! Unfurl worker: resolves one queued link against VersionOne and posts the
//! preview back to Slack.
//!
//! The worker core only sees [`UnfurlRequest`]; platform adapters in
//! [`adapters`] turn broker deliveries into that shape.

pub mod adapters;
pub mod asset;
pub mod error;
pub mod slack;
pub mod versionone;
pub mod worker;

pub use {
    asset::{AssetRef, LinkResolver},
    error::{Result, UnfurlError},
    slack::{SlackClient, SlackUnfurlPayload, UnfurlAttachment, UnfurlPoster},
    unfurler_common::UnfurlRequest,
    versionone::{AssetSource, V1Asset, VersionOneClient},
    worker::{UnfurlOutcome, UnfurlWorker},
};
