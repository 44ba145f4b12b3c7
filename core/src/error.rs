//! Error types for the robot webhook client.
//!
//! # Design
//! Each step of a send maps to exactly one variant, so a caller can tell a
//! bad configuration (`InvalidEndpoint`) from a network failure (`Transport`),
//! an HTTP-level rejection (`HttpStatus`), an unreadable reply
//! (`MalformedResponse`) and a reply the platform used to refuse the message
//! (`Application`). Nothing is retried internally.

use thiserror::Error;

use crate::http::{HttpMethod, ResponseMessage};

/// Errors returned by `RobotClient` and the pure validation helpers.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The configured endpoint does not parse as a URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Network, DNS or TLS failure raised by the HTTP transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a status other than 200.
    #[error("invalid http status {status}, body: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body of a 200 response is not a valid response message.
    #[error("malformed response body {body:?}: {reason}")]
    MalformedResponse { body: String, reason: String },

    /// The platform returned an `errcode` other than the expected one.
    #[error("{0}")]
    Application(ResponseMessage),

    /// The envelope declared a method the client does not dispatch.
    #[error("unsupported http method {0}")]
    UnsupportedMethod(HttpMethod),

    /// The message payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<ureq::Error> for WebhookError {
    fn from(err: ureq::Error) -> Self {
        WebhookError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_error_displays_remote_message_as_json() {
        let err = WebhookError::Application(ResponseMessage {
            errcode: 310000,
            errmsg: "sign not match".to_string(),
            application_host: String::new(),
            service_host: String::new(),
        });
        assert_eq!(err.to_string(), r#"{"errcode":310000,"errmsg":"sign not match"}"#);
    }

    #[test]
    fn http_status_error_includes_body() {
        let err = WebhookError::HttpStatus {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "invalid http status 502, body: bad gateway");
    }

    #[test]
    fn unsupported_method_names_the_method() {
        let err = WebhookError::UnsupportedMethod(HttpMethod::Delete);
        assert_eq!(err.to_string(), "unsupported http method DELETE");
    }
}
