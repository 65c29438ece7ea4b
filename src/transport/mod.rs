//! Transport abstraction for harper-link.
//!
//! The client never talks HTTP directly. Every command goes through the
//! [`Transport`] trait: one POST with a JSON body, returning a status code
//! and a parsed JSON body.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  HarperDB                   │
//! │                     │                       │
//! │                     ▼                       │
//! │           ┌───────────────────┐             │
//! │           │     Transport     │  ← Trait    │
//! │           └───────────────────┘             │
//! │               ▲           ▲                 │
//! │      ┌────────┴──────┐ ┌──┴────────────┐    │
//! │      │ HttpTransport │ │ test doubles  │    │
//! │      └───────────────┘ └───────────────┘    │
//! │     (reqwest, "http")     (tests)           │
//! └─────────────────────────────────────────────┘
//! ```

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use self::http::HttpTransport;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{HarperError, Result};

/// One outgoing request. The method is always POST.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// Endpoint URL.
    pub url: String,
    /// JSON body, already serialized.
    pub body: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl TransportRequest {
    /// Returns the value of a header, if present (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response as seen by the client: status plus parsed body.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body (`Null` for an empty body).
    pub body: Value,
}

impl TransportResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Creates a `200 OK` response.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// Turns the response into the command result.
    ///
    /// A status outside 200–299, or a body carrying an `error` field that is
    /// a non-empty string or an object, is a failed command. The server
    /// message is kept verbatim and classified by [`HarperError::from_server`].
    pub fn into_result(self) -> Result<Value> {
        let failed = !(200..300).contains(&self.status);
        let embedded = self.body.get("error").filter(|e| is_error_payload(e)).cloned();

        if !failed && embedded.is_none() {
            return Ok(self.body);
        }

        let status = self.status;
        let message = match embedded.or_else(|| self.body.get("message").cloned()) {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => match self.body {
                Value::Null => format!("Request failed with HTTP status {}", status),
                Value::String(text) => text,
                other => other.to_string(),
            },
        };

        Err(HarperError::from_server(Some(status), message))
    }
}

/// `"error": false`, `""` or `null` in a successful body is not a failure.
fn is_error_payload(error: &Value) -> bool {
    match error {
        Value::String(message) => !message.trim().is_empty(),
        Value::Object(_) => true,
        _ => false,
    }
}

/// Sends one command to the database.
///
/// Implementations must be `Send + Sync`; one transport is shared by every
/// request of a [`HarperDB`](crate::HarperDB) handle and by concurrently
/// drained pipeline entries.
///
/// # Errors
///
/// Network failures and timeouts are reported as
/// [`HarperError::Transport`]. HTTP error statuses are *not* transport
/// errors; return them as a [`TransportResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs the request and returns status + parsed body.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}
