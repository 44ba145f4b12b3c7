//! Client for chat-platform robot webhooks with time-based HMAC signing.
//!
//! # Overview
//! Builds a message, wraps it in a request envelope, signs the endpoint URL
//! when a secret is configured, sends it over HTTP and validates the JSON
//! reply against the envelope's expected success code. Each send is
//! fire-and-forget: failures are returned to the caller and never retried.
//!
//! # Design
//! - `sign` is pure: HMAC-SHA256 over `"{timestamp}\n{secret}"`, base64 then
//!   percent-encoded.
//! - `types::Message` is a sum type over the supported payload shapes; the
//!   `msgtype` wire tag is derived from the variant.
//! - `http` holds the envelope (`RobotRequest`) and the network-free reply
//!   validation (`parse_response`).
//! - `RobotClient` does the I/O under a single lock, so one client never has
//!   two sends in flight.

pub mod client;
pub mod error;
pub mod http;
pub mod sign;
pub mod types;

pub use client::{ClientConfig, RobotClient, DEFAULT_TIMEOUT};
pub use error::WebhookError;
pub use http::{
    parse_response, HttpMethod, HttpResponse, ResponseMessage, RobotRequest, RobotResponse, SendOptions,
};
pub use sign::{compute_signature, sign};
pub use types::{
    parse_link_template, ActionButton, At, ButtonOrientation, EntiretyActionCard, FeedCard, FeedCardLink,
    IndependentActionCard, Link, Markdown, Message, Text,
};
