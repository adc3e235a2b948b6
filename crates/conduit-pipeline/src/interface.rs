//! Interface validation: structural type checks of records against a flat model.
//!
//! Validation walks the keys the record *has*, not the keys the model declares:
//! a modeled field missing from the record is fine, a record field the model
//! does not declare is a mismatch.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use conduit_types::ConduitError;

// ---------------------------------------------------------------------------
// TypeTag
// ---------------------------------------------------------------------------

/// Primitive kind a modeled field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Object,
    Boolean,
    Number,
    Array,
}

impl TypeTag {
    /// The tag describing `value`, or `None` for `null`.
    pub fn of(value: &Value) -> Option<TypeTag> {
        match value {
            Value::String(_) => Some(TypeTag::String),
            Value::Object(_) => Some(TypeTag::Object),
            Value::Bool(_) => Some(TypeTag::Boolean),
            Value::Number(_) => Some(TypeTag::Number),
            Value::Array(_) => Some(TypeTag::Array),
            Value::Null => None,
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        TypeTag::of(value) == Some(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Object => "object",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::Array => "array",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = ConduitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "string" => Ok(TypeTag::String),
            "object" => Ok(TypeTag::Object),
            "boolean" => Ok(TypeTag::Boolean),
            "number" => Ok(TypeTag::Number),
            "array" => Ok(TypeTag::Array),
            other => Err(ConduitError::Config(format!("unknown type tag '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// InterfaceModel
// ---------------------------------------------------------------------------

/// Flat field -> type-tag schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceModel(BTreeMap<String, TypeTag>);

impl InterfaceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, tag: TypeTag) {
        self.0.insert(field.into(), tag);
    }

    pub fn expected(&self, field: &str) -> Option<TypeTag> {
        self.0.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, TypeTag)> for InterfaceModel {
    fn from_iter<T: IntoIterator<Item = (K, TypeTag)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Whether `input` (a record or a sequence of records) conforms to `model`.
pub fn is_valid_interface(input: &Value, model: &InterfaceModel) -> bool {
    match input {
        Value::Array(records) => records.iter().all(|r| is_valid_record(r, model)),
        record => is_valid_record(record, model),
    }
}

fn is_valid_record(record: &Value, model: &InterfaceModel) -> bool {
    let Some(fields) = record.as_object() else {
        return false;
    };
    fields
        .iter()
        .all(|(key, value)| model.expected(key).is_some_and(|tag| tag.matches(value)))
}

/// A single reason an input failed [`is_valid_interface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Position in the input sequence; `None` for a single record.
    pub index: Option<usize>,
    /// Offending field; `None` when the element is not a record at all.
    pub field: Option<String>,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.index, &self.field) {
            (Some(i), Some(field)) => write!(f, "[{i}].{field}: {}", self.message),
            (Some(i), None) => write!(f, "[{i}]: {}", self.message),
            (None, Some(field)) => write!(f, "{field}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Every reason `input` does not conform to `model`. Empty iff valid.
pub fn interface_violations(input: &Value, model: &InterfaceModel) -> Vec<Violation> {
    match input {
        Value::Array(records) => records
            .iter()
            .enumerate()
            .flat_map(|(i, r)| record_violations(Some(i), r, model))
            .collect(),
        record => record_violations(None, record, model),
    }
}

fn record_violations(index: Option<usize>, record: &Value, model: &InterfaceModel) -> Vec<Violation> {
    let Some(fields) = record.as_object() else {
        return vec![Violation {
            index,
            field: None,
            message: "not a record".into(),
        }];
    };
    fields
        .iter()
        .filter_map(|(key, value)| {
            let found = TypeTag::of(value).map_or("null", TypeTag::as_str);
            let message = match model.expected(key) {
                None => format!("field is not declared by the model (found {found})"),
                Some(tag) if !tag.matches(value) => format!("expected {tag}, found {found}"),
                Some(_) => return None,
            };
            Some(Violation {
                index,
                field: Some(key.clone()),
                message,
            })
        })
        .collect()
}
