use std::time::Duration;

use async_trait::async_trait;
use conduit_types::{ConduitError, Result};
use serde_json::Value;

use crate::{Upstream, UpstreamRequest, UpstreamResponse};

// ---------------------------------------------------------------------------
// HttpUpstream
// ---------------------------------------------------------------------------

/// Upstream reached over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    name: String,
    timeout: Duration,
}

impl HttpUpstream {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: "http".to_string(),
            timeout,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    fn map_send_error(&self, err: reqwest::Error) -> ConduitError {
        if err.is_timeout() {
            ConduitError::RequestTimeout {
                upstream: self.name.clone(),
                timeout_ms: self.timeout_ms(),
            }
        } else if err.is_builder() {
            ConduitError::Config(format!("cannot build upstream request: {err}"))
        } else {
            ConduitError::Transport {
                upstream: self.name.clone(),
                message: err.to_string(),
            }
        }
    }
}

/// 429 and every 5xx are worth another attempt.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

pub(crate) fn status_error(upstream: &str, status: u16, body: &str) -> ConduitError {
    ConduitError::Upstream {
        upstream: upstream.to_string(),
        status,
        message: extract_error_message(body),
        retryable: is_retryable_status(status),
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

// ---------------------------------------------------------------------------
// Upstream implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        let method = reqwest::Method::from_bytes(request.options.method.to_uppercase().as_bytes())
            .map_err(|_| {
                ConduitError::Config(format!("invalid HTTP method '{}'", request.options.method))
            })?;

        let mut builder = self
            .client
            .request(method, &request.uri)
            .timeout(self.timeout);
        for (name, value) in &request.options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!(upstream = %self.name, uri = %request.uri, "Upstream request");
        let resp = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| self.map_send_error(e))?;
        tracing::debug!(upstream = %self.name, status, bytes = bytes.len(), "Upstream response");

        if !(200..300).contains(&status) {
            return Err(status_error(
                &self.name,
                status,
                &String::from_utf8_lossy(&bytes),
            ));
        }

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| ConduitError::Upstream {
                upstream: self.name.clone(),
                status,
                message: format!("Failed to parse response JSON: {e}"),
                retryable: false,
            })?
        };

        Ok(UpstreamResponse { status, body })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
