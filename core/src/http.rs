//! Request envelope and plain-data response handling.
//!
//! # Design
//! `RobotRequest` binds a message to the transport metadata a send needs:
//! method, headers, serialized body and the application-level success code.
//! `HttpResponse` is the transport's reply described as plain data, and
//! `parse_response` turns it into a `ResponseMessage` without touching the
//! network, so the validation rules are testable on their own. The client
//! only does the I/O in between.

use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::WebhookError;
use crate::types::{At, Message};

/// Response header carrying the application host redirect hint.
pub const APPLICATION_HOST_HEADER: &str = "Application-Host";
/// Response header carrying the service host redirect hint.
pub const LOCATION_HOST_HEADER: &str = "Location-Host";

/// HTTP method for a request. Only `Get`, `Post` and `Put` are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Whether `RobotClient::request` sends this method over the wire.
    pub fn is_dispatched(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-send options: mentions and the `errcode` that counts as success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub at: At,
    pub success_code: i64,
}

impl SendOptions {
    pub fn at_mobiles<I, S>(mut self, mobiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.at.at_mobiles = mobiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn at_user_ids<I, S>(mut self, user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.at.at_user_ids = user_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn at_all(mut self) -> Self {
        self.at.is_at_all = true;
        self
    }

    pub fn success_code(mut self, code: i64) -> Self {
        self.success_code = code;
        self
    }
}

/// Outgoing JSON body: the message envelope plus an optional `at` block.
struct SendBody<'a> {
    message: &'a Message,
    at: &'a At,
}

impl Serialize for SendBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.message.serialize_entries(&mut map)?;
        if !self.at.is_empty() {
            map.serialize_entry("at", self.at)?;
        }
        map.end()
    }
}

/// A request envelope ready for `RobotClient::request`.
///
/// Built fresh for every send and discarded once the call completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotRequest {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub success_code: i64,
}

impl RobotRequest {
    /// POST envelope for the robot send API.
    pub fn send(message: &Message, options: &SendOptions) -> Result<Self, WebhookError> {
        let body = serde_json::to_string(&SendBody {
            message,
            at: &options.at,
        })?;
        Ok(Self {
            method: HttpMethod::Post,
            headers: vec![(
                "content-type".to_string(),
                "application/json; charset=utf-8".to_string(),
            )],
            body: Some(body),
            success_code: options.success_code,
        })
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Reply body of the robot API, plus redirect hints taken from headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub application_host: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_host: String,
}

impl fmt::Display for ResponseMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(err) => write!(f, "{err}"),
        }
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotResponse {
    pub message: ResponseMessage,
    pub http: HttpResponse,
}

/// Validate a reply against the envelope's expected success code.
///
/// Status is checked before the body, so a non-200 reply is rejected even
/// when it carries a matching `errcode`.
pub fn parse_response(response: &HttpResponse, success_code: i64) -> Result<ResponseMessage, WebhookError> {
    if response.status != 200 {
        return Err(WebhookError::HttpStatus {
            status: response.status,
            body: response.body.clone(),
        });
    }

    let mut message: ResponseMessage =
        serde_json::from_str(&response.body).map_err(|e| WebhookError::MalformedResponse {
            body: response.body.clone(),
            reason: e.to_string(),
        })?;
    message.application_host = response
        .header(APPLICATION_HOST_HEADER)
        .unwrap_or_default()
        .to_string();
    message.service_host = response
        .header(LOCATION_HOST_HEADER)
        .unwrap_or_default()
        .to_string();

    if message.errcode != success_code {
        return Err(WebhookError::Application(message));
    }
    Ok(message)
}
