//! Field mapping: rename upstream records according to a [`Contract`].

use serde_json::{Map, Value};

use conduit_types::{paths, ConduitError, Contract, Envelope, Result};

/// Path of the contract inside the envelope.
const CONTRACT_PATH: &str = "data.config.contract";

/// Rename the keys of `record` through `contract`.
///
/// The output has one entry per contract output name whose input field is
/// present in `record`. Record fields the contract does not mention are
/// dropped.
pub fn map_keys_with(record: &Map<String, Value>, contract: &Contract) -> Map<String, Value> {
    contract
        .entries()
        .filter_map(|(output, input)| {
            record
                .get(input)
                .map(|value| (output.to_string(), value.clone()))
        })
        .collect()
}

/// Map a single record or a sequence of records.
pub fn map_rows(rows: &Value, contract: &Contract) -> Result<Value> {
    match rows {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(Value::Object(map_keys_with(record, contract))),
                other => Err(ConduitError::Mapping(format!(
                    "row {index} is not a record: {}",
                    kind_name(other)
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(record) => Ok(Value::Object(map_keys_with(record, contract))),
        other => Err(ConduitError::Mapping(format!(
            "response body is neither a record nor a sequence: {}",
            kind_name(other)
        ))),
    }
}

/// Pipeline step: map `data.response.body` into `data.mapped_response`.
pub fn map_response(envelope: Envelope) -> Result<Envelope> {
    let contract: Contract = match envelope.get(CONTRACT_PATH) {
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| ConduitError::Config(format!("contract is malformed: {e}")))?,
        None => return Err(ConduitError::Config("envelope has no contract".into())),
    };
    let body = envelope
        .get(paths::RESPONSE_BODY)
        .ok_or_else(|| ConduitError::Mapping("envelope has no response body".into()))?;

    let mapped = map_rows(body, &contract)?;
    tracing::debug!(fields = contract.len(), "Mapped response through contract");
    envelope.with(paths::MAPPED_RESPONSE, mapped)
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
