//! `reqwest`-backed transport.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Transport, TransportRequest, TransportResponse};
use crate::error::{HarperError, Result};

/// HTTP transport built on a shared `reqwest::Client` (connection pooling
/// and TLS are the client's business).
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport reusing an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            warn!(url = %request.url, error = %e, timeout = e.is_timeout(), "HTTP request failed");
            HarperError::transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| HarperError::transport(e.to_string()))?;
        debug!(status, bytes = text.len(), "HTTP response received");

        // Non-JSON bodies (proxies, load balancers) are kept as a string so
        // the message still reaches the caller.
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(TransportResponse::new(status, body))
    }
}
