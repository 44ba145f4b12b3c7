//! Blocking client for a signed robot webhook.
//!
//! # Design
//! `RobotClient` keeps the endpoint, optional secret, timeout and `ureq`
//! agent behind one `Mutex`. The lock is held for the whole of `request`,
//! including the network call, so concurrent callers sharing a client are
//! fully serialized: at most one send is in flight per client. The signature
//! is recomputed for every request from the base endpoint and the current
//! secret, and the parsed reply is returned to the caller rather than kept
//! on the client.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::error::WebhookError;
use crate::http::{parse_response, HttpMethod, HttpResponse, RobotRequest, RobotResponse, SendOptions};
use crate::sign::{compute_signature, now_millis};
use crate::types::{parse_link_template, ButtonOrientation, FeedCardLink, Message};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for `RobotClient::new`. Later builder calls override earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub secret: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

struct Inner {
    endpoint: String,
    secret: Option<String>,
    timeout: Duration,
    agent: ureq::Agent,
}

impl Inner {
    fn signed_url(&self, timestamp_ms: i64) -> Result<String, WebhookError> {
        let Some(secret) = &self.secret else {
            return Ok(self.endpoint.clone());
        };
        let mut url = parse_endpoint(&self.endpoint)?;
        url.query_pairs_mut()
            .append_pair("timestamp", &timestamp_ms.to_string())
            .append_pair("sign", &compute_signature(secret, timestamp_ms));
        Ok(url.into())
    }

    fn dispatch(&self, url: &str, req: &RobotRequest) -> Result<HttpResponse, WebhookError> {
        let body = req.body.as_deref().unwrap_or_default().as_bytes();
        let result = match req.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &req.headers).call(),
            HttpMethod::Post => with_headers(self.agent.post(url), &req.headers).send(body),
            HttpMethod::Put => with_headers(self.agent.put(url), &req.headers).send(body),
            other => return Err(WebhookError::UnsupportedMethod(other)),
        };
        let mut response = result?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Client for one robot webhook. Share it across threads with `Arc`.
pub struct RobotClient {
    inner: Mutex<Inner>,
}

impl RobotClient {
    pub fn new(config: ClientConfig) -> Result<Self, WebhookError> {
        parse_endpoint(&config.endpoint)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                agent: build_agent(config.timeout),
                endpoint: config.endpoint,
                secret: config.secret.filter(|s| !s.is_empty()),
                timeout: config.timeout,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Base endpoint, without signature parameters.
    pub fn endpoint(&self) -> String {
        self.lock().endpoint.clone()
    }

    pub fn secret(&self) -> Option<String> {
        self.lock().secret.clone()
    }

    /// Replace the signing secret. Empty or `None` disables signing.
    pub fn set_secret(&self, secret: Option<String>) {
        self.lock().secret = secret.filter(|s| !s.is_empty());
    }

    pub fn timeout(&self) -> Duration {
        self.lock().timeout
    }

    pub fn set_timeout(&self, timeout: Duration) {
        let mut inner = self.lock();
        inner.timeout = timeout;
        inner.agent = build_agent(timeout);
    }

    /// URL the next request would hit, signed with the current time.
    pub fn signed_url(&self) -> Result<String, WebhookError> {
        self.lock().signed_url(now_millis())
    }

    /// Dispatch one envelope and validate the reply.
    ///
    /// Blocks while another request on this client is in flight. Every
    /// failure is returned as-is; nothing is retried.
    pub fn request(&self, req: &RobotRequest) -> Result<RobotResponse, WebhookError> {
        let inner = self.lock();
        let url = inner.signed_url(now_millis())?;
        let parsed = parse_endpoint(&url)?;
        if !req.method.is_dispatched() {
            warn!(method = %req.method, "robot request method not supported");
            return Err(WebhookError::UnsupportedMethod(req.method));
        }

        debug!(
            method = %req.method,
            host = parsed.host_str().unwrap_or_default(),
            path = parsed.path(),
            "dispatching robot request"
        );
        let response = inner.dispatch(&url, req).inspect_err(|e| {
            warn!(method = %req.method, error = %e, "robot request not delivered");
        })?;

        let message = parse_response(&response, req.success_code).inspect_err(|e| {
            warn!(status = response.status, error = %e, "robot request rejected");
        })?;
        debug!(errcode = message.errcode, "robot request accepted");

        Ok(RobotResponse {
            message,
            http: response,
        })
    }

    pub fn send(&self, message: &Message, options: &SendOptions) -> Result<RobotResponse, WebhookError> {
        self.request(&RobotRequest::send(message, options)?)
    }

    pub fn send_text(&self, content: &str, options: &SendOptions) -> Result<RobotResponse, WebhookError> {
        self.send(&Message::text(content), options)
    }

    pub fn send_link(
        &self,
        title: &str,
        text: &str,
        message_url: &str,
        pic_url: &str,
        options: &SendOptions,
    ) -> Result<RobotResponse, WebhookError> {
        self.send(&Message::link(title, text, message_url, pic_url), options)
    }

    /// Send a link card parsed with `parse_link_template`.
    pub fn send_link_template(&self, template: &str, options: &SendOptions) -> Result<RobotResponse, WebhookError> {
        self.send(&Message::Link(parse_link_template(template)), options)
    }

    pub fn send_markdown(&self, title: &str, text: &str, options: &SendOptions) -> Result<RobotResponse, WebhookError> {
        self.send(&Message::markdown(title, text), options)
    }

    pub fn send_entirety_action_card(
        &self,
        title: &str,
        text: &str,
        single_title: &str,
        single_url: &str,
        btn_orientation: ButtonOrientation,
        options: &SendOptions,
    ) -> Result<RobotResponse, WebhookError> {
        let message = Message::entirety_action_card(title, text, single_title, single_url, btn_orientation);
        self.send(&message, options)
    }

    /// Button order is unspecified, see `Message::independent_action_card`.
    pub fn send_independent_action_card(
        &self,
        title: &str,
        text: &str,
        btn_orientation: ButtonOrientation,
        buttons: HashMap<String, String>,
        options: &SendOptions,
    ) -> Result<RobotResponse, WebhookError> {
        let message = Message::independent_action_card(title, text, btn_orientation, buttons);
        self.send(&message, options)
    }

    pub fn send_feed_card(&self, links: Vec<FeedCardLink>, options: &SendOptions) -> Result<RobotResponse, WebhookError> {
        self.send(&Message::feed_card(links), options)
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, WebhookError> {
    Url::parse(endpoint).map_err(|e| WebhookError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Agent that returns 4xx/5xx as data so `parse_response` can judge them.
fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
