//! Static operation and service configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ConduitError, Result};

// ---------------------------------------------------------------------------
// Contract: output field -> input field rename map
// ---------------------------------------------------------------------------

/// Declarative rename map from output field name to upstream field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contract(BTreeMap<String, String>);

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    /// The contract used by the stores operation against the stub upstream.
    pub fn stores() -> Self {
        [
            ("type", "class"),
            ("description", "report"),
            ("location", "address"),
            ("distance", "range"),
        ]
        .into_iter()
        .collect()
    }

    pub fn insert(&mut self, output: impl Into<String>, input: impl Into<String>) {
        self.0.insert(output.into(), input.into());
    }

    /// The upstream field that feeds `output`.
    pub fn source_for(&self, output: &str) -> Option<&str> {
        self.0.get(output).map(String::as_str)
    }

    /// Iterate `(output, input)` pairs in output-name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(o, i)| (o.as_str(), i.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<O: Into<String>, I: Into<String>> FromIterator<(O, I)> for Contract {
    fn from_iter<T: IntoIterator<Item = (O, I)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(o, i)| (o.into(), i.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Restriction: property / operator / literal triple
// ---------------------------------------------------------------------------

/// A bound on a record field, e.g. `distance` `less than` `"200"`.
///
/// `operator` is a symbolic name resolved against an operator registry before
/// use; `value` is usually a string that is coerced at comparison time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restriction {
    pub property: String,
    pub operator: String,
    pub value: Value,
}

impl Restriction {
    pub fn new(
        property: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            property: property.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// OperationConfig
// ---------------------------------------------------------------------------

/// Static configuration for one proxied operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationConfig {
    pub host: String,
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub contract: Contract,
    #[serde(default)]
    pub filters: Vec<Restriction>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl OperationConfig {
    /// Full upstream URI: `host` joined with `endpoint` by exactly one slash.
    pub fn uri(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let endpoint = self.endpoint.trim_start_matches('/');
        if endpoint.is_empty() {
            host.to_string()
        } else {
            format!("{host}/{endpoint}")
        }
    }
}

impl Default for OperationConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());
        Self {
            host: "http://127.0.0.1:8081".to_string(),
            endpoint: "/stores".to_string(),
            method: default_method(),
            headers,
            contract: Contract::stores(),
            filters: vec![Restriction::new("distance", "less than", "200")],
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

/// Environment variable overriding [`OperationConfig::host`].
pub const ENV_UPSTREAM_HOST: &str = "CONDUIT_UPSTREAM_HOST";
/// Environment variable overriding [`ServiceConfig::listen`].
pub const ENV_LISTEN: &str = "CONDUIT_LISTEN";

/// Top-level configuration for the serving binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub listen: String,
    pub timeout_ms: u64,
    pub max_retries: usize,
    pub backoff_ms: u64,
    pub operation: OperationConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            timeout_ms: 5_000,
            max_retries: 0,
            backoff_ms: 200,
            operation: OperationConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Read a JSON config file. Absent fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| {
            ConduitError::Config(format!("{}: {e}", path.display()))
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to resolve variable names.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup(ENV_UPSTREAM_HOST).filter(|v| !v.is_empty()) {
            self.operation.host = host;
        }
        if let Some(listen) = lookup(ENV_LISTEN).filter(|v| !v.is_empty()) {
            self.listen = listen;
        }
        self
    }
}
