//! Filter stage: keep the records that satisfy every predicate.

use std::sync::Arc;

use serde_json::Value;

use conduit_types::{paths, ConduitError, Envelope, Result};

use crate::path::set_with;
use crate::restriction::{substitute_operators, ResolvedRestriction};

/// A shareable test over one record.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Build a filter that keeps, in order, the records passing all `predicates`.
///
/// With no predicates every record is kept.
pub fn apply_filters(predicates: Vec<Predicate>) -> impl Fn(&[Value]) -> Vec<Value> + Send + Sync {
    move |records: &[Value]| {
        records
            .iter()
            .filter(|&record| predicates.iter().all(|p| p(record)))
            .cloned()
            .collect()
    }
}

/// Turn a resolved restriction into a filter predicate.
pub fn restriction_predicate(restriction: ResolvedRestriction) -> Predicate {
    Arc::new(move |record: &Value| restriction.holds(record))
}

/// Pipeline step: apply the configured filters to `data.mapped_response`.
///
/// Only sequences are filtered; a single mapped record passes through.
pub fn filter_response(envelope: Envelope) -> Result<Envelope> {
    let config = envelope.config()?;
    let predicates: Vec<Predicate> = substitute_operators(&config.filters)?
        .into_iter()
        .map(restriction_predicate)
        .collect();
    let filter = apply_filters(predicates);

    set_with(paths::MAPPED_RESPONSE, move |current: Option<&Value>| match current {
        Some(Value::Array(rows)) => {
            let kept = filter(rows.as_slice());
            tracing::debug!(before = rows.len(), after = kept.len(), "Filtered mapped response");
            Ok(Value::Array(kept))
        }
        Some(other) => Ok(other.clone()),
        None => Err(ConduitError::Mapping(
            "envelope has no mapped response to filter".into(),
        )),
    })(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_types::{OperationConfig, Restriction};
    use serde_json::json;

    fn distance_below(limit: f64) -> Predicate {
        Arc::new(move |r: &Value| r["distance"].as_f64().is_some_and(|d| d < limit))
    }

    fn rows() -> Vec<Value> {
        vec![
            json!({"distance": 100}),
            json!({"distance": 50}),
            json!({"distance": 220}),
            json!({"distance": 10}),
        ]
    }

    #[test]
    fn no_predicates_keeps_everything() {
        assert_eq!(apply_filters(Vec::new())(&rows()), rows());
    }

    #[test]
    fn keeps_order_and_drops_failures() {
        let kept = apply_filters(vec![distance_below(200.0)])(&rows());
        assert_eq!(
            kept,
            vec![json!({"distance": 100}), json!({"distance": 50}), json!({"distance": 10})]
        );
    }

    #[test]
    fn predicates_are_conjunctive() {
        let at_least_50: Predicate =
            Arc::new(|r: &Value| r["distance"].as_f64().is_some_and(|d| d >= 50.0));
        let kept = apply_filters(vec![distance_below(200.0), at_least_50])(&rows());
        assert_eq!(kept, vec![json!({"distance": 100}), json!({"distance": 50})]);
    }

    #[test]
    fn input_is_left_intact() {
        let input = rows();
        let _ = apply_filters(vec![distance_below(0.0)])(&input);
        assert_eq!(input, rows());
    }

    fn envelope_with(mapped: Value, filters: Vec<Restriction>) -> Envelope {
        let config = OperationConfig {
            filters,
            ..OperationConfig::default()
        };
        Envelope::new(json!(null), &config)
            .unwrap()
            .with(paths::MAPPED_RESPONSE, mapped)
            .unwrap()
    }

    #[test]
    fn filter_response_uses_configured_restrictions() {
        let env = envelope_with(
            Value::Array(rows()),
            vec![Restriction::new("distance", "less than", "200")],
        );
        let out = filter_response(env).unwrap();
        assert_eq!(
            out.get(paths::MAPPED_RESPONSE),
            Some(&json!([{"distance": 100}, {"distance": 50}, {"distance": 10}]))
        );
    }

    #[test]
    fn filter_response_passes_single_record_through() {
        let env = envelope_with(json!({"distance": 999}), vec![Restriction::new("distance", "less than", "200")]);
        let out = filter_response(env.clone()).unwrap();
        assert_eq!(out, env);
    }

    #[test]
    fn filter_response_rejects_unknown_operator() {
        let env = envelope_with(Value::Array(rows()), vec![Restriction::new("distance", "near", "1")]);
        assert!(matches!(
            filter_response(env),
            Err(ConduitError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn filter_response_requires_mapped_response() {
        let env = Envelope::new(json!(null), &OperationConfig::default()).unwrap();
        assert!(matches!(filter_response(env), Err(ConduitError::Mapping(_))));
    }
}
