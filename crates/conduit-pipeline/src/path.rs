//! Copy-on-write update of a single envelope path.

use serde_json::Value;

use conduit_types::{Envelope, Result};

/// Build a step function that rewrites the value at a dotted `path`.
///
/// The transform receives the current value (`None` when the path does not
/// exist) and its output is written back into a fresh envelope. Sibling
/// fields are carried over unchanged. The write always happens, even when
/// the transform returns its input untouched. A path that runs through an
/// existing non-object value is an `InvalidPath` error.
pub fn set_with<F>(path: impl Into<String>, transform: F) -> impl Fn(Envelope) -> Result<Envelope> + Send + Sync
where
    F: Fn(Option<&Value>) -> Result<Value> + Send + Sync,
{
    let path = path.into();
    move |envelope: Envelope| {
        let next = transform(envelope.get(&path))?;
        envelope.with(&path, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_types::ConduitError;
    use serde_json::json;

    fn identity(value: Option<&Value>) -> Result<Value> {
        Ok(value.cloned().unwrap_or(Value::Null))
    }

    fn sample() -> Envelope {
        Envelope::from_value(json!({
            "event": {"body": {"q": "x"}},
            "data": {"response": {"body": [1, 2, 3]}, "config": {"host": "h"}}
        }))
        .unwrap()
    }

    #[test]
    fn identity_yields_structurally_equal_envelope() {
        let env = sample();
        let out = set_with("data.response.body", identity)(env.clone()).unwrap();
        assert_eq!(out, env);
    }

    #[test]
    fn transform_rewrites_only_target() {
        let env = sample();
        let double = set_with("data.response.body", |value: Option<&Value>| {
            let rows = value.and_then(Value::as_array).cloned().unwrap_or_default();
            Ok(Value::Array(
                rows.iter()
                    .filter_map(Value::as_i64)
                    .map(|n| json!(n * 2))
                    .collect(),
            ))
        });

        let out = double(env.clone()).unwrap();
        assert_eq!(out.get("data.response.body"), Some(&json!([2, 4, 6])));
        assert_eq!(out.get("data.config"), env.get("data.config"));
        assert_eq!(out.get("event.body"), env.get("event.body"));
    }

    #[test]
    fn absent_path_reads_none_and_creates_it() {
        let seen_none = set_with("data.mapped_response", |value: Option<&Value>| {
            assert!(value.is_none());
            Ok(json!("created"))
        });
        let out = seen_none(sample()).unwrap();
        assert_eq!(out.get("data.mapped_response"), Some(&json!("created")));
    }

    #[test]
    fn transform_error_propagates() {
        let failing = set_with("data", |_value: Option<&Value>| {
            Err(ConduitError::Mapping("cannot".into()))
        });
        assert!(matches!(failing(sample()), Err(ConduitError::Mapping(_))));
    }

    #[test]
    fn path_through_array_fails_and_keeps_records() {
        let env = Envelope::from_value(json!({
            "data": {"response": {"body": [{"range": 1}, {"range": 2}]}}
        }))
        .unwrap();
        let through_array = set_with("data.response.body.0", identity);

        assert!(matches!(
            through_array(env.clone()),
            Err(ConduitError::InvalidPath { .. })
        ));
        assert_eq!(
            env.get("data.response.body"),
            Some(&json!([{"range": 1}, {"range": 2}]))
        );
    }

    #[test]
    fn path_through_scalar_fails() {
        let env = Envelope::from_value(json!({"data": {"response": {"body": "text"}}})).unwrap();
        let nested = set_with("data.response.body.rows", |_value: Option<&Value>| Ok(json!([])));
        assert!(matches!(nested(env), Err(ConduitError::InvalidPath { .. })));
    }

    #[test]
    fn invalid_path_is_rejected() {
        let bad = set_with("data..body", identity);
        assert!(matches!(bad(sample()), Err(ConduitError::InvalidPath { .. })));
    }
}
