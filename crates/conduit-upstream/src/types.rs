use std::collections::BTreeMap;

use conduit_types::OperationConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// UpstreamRequest
// ---------------------------------------------------------------------------

/// Method and headers sent alongside the target URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// A fully composed upstream call, as stored under `data.request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamRequest {
    pub uri: String,
    pub options: RequestOptions,
}

impl UpstreamRequest {
    pub fn get(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            options: RequestOptions {
                method: "GET".into(),
                headers: BTreeMap::new(),
            },
        }
    }

    pub fn from_config(config: &OperationConfig) -> Self {
        Self {
            uri: config.uri(),
            options: RequestOptions {
                method: config.method.clone(),
                headers: config.headers.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// UpstreamResponse
// ---------------------------------------------------------------------------

/// A successful upstream reply, as stored under `data.response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}
