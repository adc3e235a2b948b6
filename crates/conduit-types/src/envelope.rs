//! Immutable JSON envelope threaded through every pipeline step.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ConduitError, OperationConfig, Result};

/// Well-known envelope paths.
pub mod paths {
    pub const EVENT_BODY: &str = "event.body";
    pub const CONFIG: &str = "data.config";
    pub const REQUEST: &str = "data.request";
    pub const RESPONSE: &str = "data.response";
    pub const RESPONSE_BODY: &str = "data.response.body";
    pub const MAPPED_RESPONSE: &str = "data.mapped_response";
    pub const RESULT: &str = "result";
}

/// The carrier passed between pipeline steps.
///
/// An `Envelope` is never updated in place: [`with`](Envelope::with) clones the
/// document, assigns the new value, and hands back a fresh envelope. Two
/// envelopes compare equal when their JSON documents are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope {
    root: Value,
}

impl Envelope {
    /// An envelope with no fields.
    pub fn empty() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Build the initial envelope for one inbound request.
    pub fn new(event_body: Value, config: &OperationConfig) -> Result<Self> {
        Self::empty()
            .with(paths::EVENT_BODY, event_body)?
            .with(paths::CONFIG, serde_json::to_value(config)?)
    }

    /// Wrap an existing JSON document. The root must be an object.
    pub fn from_value(root: Value) -> Result<Self> {
        if !root.is_object() {
            return Err(ConduitError::Other(
                "envelope root must be a JSON object".into(),
            ));
        }
        Ok(Self { root })
    }

    /// Read the value at a dotted path, if every segment exists.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments = split_path(path).ok()?;
        segments
            .iter()
            .try_fold(&self.root, |current, segment| current.get(*segment))
    }

    /// Return a new envelope with `value` stored at `path`.
    ///
    /// Missing intermediate objects are created. An existing intermediate
    /// that is not an object is an [`ConduitError::InvalidPath`], never
    /// overwritten. `self` is left untouched.
    pub fn with(&self, path: &str, value: Value) -> Result<Envelope> {
        let segments = split_path(path)?;
        let mut root = self.root.clone();
        assign(&mut root, path, &segments, value)?;
        Ok(Envelope { root })
    }

    /// Deserialize the operation configuration stored at `data.config`.
    pub fn config(&self) -> Result<OperationConfig> {
        let raw = self
            .get(paths::CONFIG)
            .ok_or_else(|| ConduitError::Config("envelope has no data.config".into()))?;
        serde_json::from_value(raw.clone())
            .map_err(|e| ConduitError::Config(format!("data.config is malformed: {e}")))
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::empty()
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    if path.trim().is_empty() {
        return Err(ConduitError::InvalidPath {
            path: path.to_string(),
            message: "path is empty".into(),
        });
    }
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConduitError::InvalidPath {
            path: path.to_string(),
            message: "path contains an empty segment".into(),
        });
    }
    Ok(segments)
}

fn assign(target: &mut Value, path: &str, segments: &[&str], value: Value) -> Result<()> {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };
    let Value::Object(map) = target else {
        return Err(ConduitError::InvalidPath {
            path: path.to_string(),
            message: format!("segment '{head}' crosses a non-object value"),
        });
    };
    if rest.is_empty() {
        map.insert(head.to_string(), value);
        return Ok(());
    }
    let slot = map
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    assign(slot, path, rest, value)
}
