//! In-memory upstream and the canonical stub store records.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use conduit_types::Result;
use serde_json::{json, Value};

use crate::http::status_error;
use crate::{Upstream, UpstreamRequest, UpstreamResponse};

/// Records served by the upstream stub, in its own field vocabulary.
pub fn stub_records() -> Value {
    json!([
        {
            "type": "store",
            "class": "grocery",
            "report": "Fresh produce and a bakery counter",
            "address": "12 Market Street",
            "range": 100
        },
        {
            "type": "store",
            "class": "pharmacy",
            "report": "Open late on weekdays",
            "address": "3 Station Road",
            "range": 50
        },
        {
            "type": "store",
            "class": "hardware",
            "report": "Tools, paint and garden supplies",
            "address": "480 Industrial Park",
            "range": 220
        },
        {
            "type": "store",
            "class": "bookshop",
            "report": "Second-hand and new titles",
            "address": "7 Library Lane",
            "range": 10
        }
    ])
}

// ---------------------------------------------------------------------------
// StaticUpstream
// ---------------------------------------------------------------------------

/// Upstream that answers every request with the same status and body.
///
/// Requests are recorded so tests can assert on what the pipeline sent.
pub struct StaticUpstream {
    status: u16,
    body: Value,
    delay: Duration,
    sent: Mutex<Vec<UpstreamRequest>>,
}

impl StaticUpstream {
    pub fn new(body: Value) -> Self {
        Self {
            status: 200,
            body,
            delay: Duration::ZERO,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Serves [`stub_records`].
    pub fn stub() -> Self {
        Self::new(stub_records())
    }

    /// A non-2xx status turns every reply into an upstream error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn sent(&self) -> Vec<UpstreamRequest> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Upstream for StaticUpstream {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if !(200..300).contains(&self.status) {
            return Err(status_error(self.name(), self.status, &self.body.to_string()));
        }
        Ok(UpstreamResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}
