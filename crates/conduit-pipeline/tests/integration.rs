//! End-to-end tests for the `/stores` pipeline.
//!
//! Each test runs the full chain against an in-memory upstream:
//! compose request -> fetch -> map -> filter -> build result -> validate.

use std::time::Duration;

use serde_json::{json, Value};

use conduit_pipeline::{
    comply_with, execute_with_retry, interface_violations, is_valid_interface, run_operation,
    stores_pipeline, BackoffPolicy, InterfaceModel, Pipeline, TypeTag,
};
use conduit_types::{paths, ConduitError, Envelope, OperationConfig, Restriction};
use conduit_upstream::{stub_records, DynUpstream, StaticUpstream};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn stub_pipeline() -> Pipeline {
    stores_pipeline(DynUpstream::new(StaticUpstream::stub()))
}

fn stores_model() -> InterfaceModel {
    [
        ("type", TypeTag::String),
        ("description", TypeTag::String),
        ("location", TypeTag::String),
        ("distance", TypeTag::Number),
    ]
    .into_iter()
    .collect()
}

fn distances(result: &Value) -> Vec<i64> {
    result["data"]
        .as_array()
        .expect("result data should be a sequence")
        .iter()
        .map(|r| r["distance"].as_i64().expect("distance should be a number"))
        .collect()
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stores_keeps_records_under_200_in_order() {
    let result = run_operation(&stub_pipeline(), &OperationConfig::default(), json!(null))
        .await
        .expect("pipeline should succeed");

    assert_eq!(distances(&result), vec![100, 50, 10]);
    assert_eq!(result["metadata"], json!({}));
    assert_eq!(
        result["data"][0],
        json!({
            "type": "grocery",
            "description": "Fresh produce and a bakery counter",
            "location": "12 Market Street",
            "distance": 100
        })
    );
}

#[tokio::test]
async fn stores_output_passes_both_validators() {
    let result = run_operation(&stub_pipeline(), &OperationConfig::default(), json!(null))
        .await
        .unwrap();
    let data = &result["data"];

    assert!(is_valid_interface(data, &stores_model()));
    assert!(interface_violations(data, &stores_model()).is_empty());
    assert!(comply_with(data, &[Restriction::new("distance", "less than", "200")]).unwrap());
}

#[tokio::test]
async fn raw_upstream_records_fail_the_stores_model() {
    // The upstream vocabulary (range, class, ...) is not the public one.
    assert!(!is_valid_interface(&stub_records(), &stores_model()));
}

#[tokio::test]
async fn envelope_keeps_every_intermediate() {
    let envelope = Envelope::new(json!({"q": "stores"}), &OperationConfig::default()).unwrap();
    let out = stub_pipeline().run(envelope.clone()).await.unwrap();

    assert_eq!(out.get(paths::EVENT_BODY), Some(&json!({"q": "stores"})));
    assert_eq!(out.get(paths::CONFIG), envelope.get(paths::CONFIG));
    assert_eq!(
        out.get("data.request.uri"),
        Some(&json!("http://127.0.0.1:8081/stores"))
    );
    assert_eq!(out.get(paths::RESPONSE_BODY), Some(&stub_records()));
    assert_eq!(out.get("data.response.status"), Some(&json!(200)));
    assert!(out.get(paths::RESULT).is_some());

    // The input envelope was never touched.
    assert!(envelope.get(paths::REQUEST).is_none());
}

#[tokio::test]
async fn configured_filters_and_contract_drive_the_output() {
    let config = OperationConfig {
        filters: vec![
            Restriction::new("distance", "at least", "50"),
            Restriction::new("distance", "at most", 220),
        ],
        contract: [("distance", "range"), ("kind", "class")]
            .into_iter()
            .collect(),
        ..OperationConfig::default()
    };

    let result = run_operation(&stub_pipeline(), &config, json!(null)).await.unwrap();
    assert_eq!(
        result["data"],
        json!([
            {"distance": 100, "kind": "grocery"},
            {"distance": 50, "kind": "pharmacy"},
            {"distance": 220, "kind": "hardware"}
        ])
    );
}

#[tokio::test]
async fn no_filters_keeps_every_record() {
    let config = OperationConfig {
        filters: Vec::new(),
        ..OperationConfig::default()
    };
    let result = run_operation(&stub_pipeline(), &config, json!(null)).await.unwrap();
    assert_eq!(distances(&result), vec![100, 50, 220, 10]);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upstream_error_aborts_without_result() {
    let pipeline = stores_pipeline(DynUpstream::new(
        StaticUpstream::new(json!({"error": "maintenance"})).with_status(503),
    ));
    let err = run_operation(&pipeline, &OperationConfig::default(), json!(null))
        .await
        .unwrap_err();

    assert!(matches!(err, ConduitError::Upstream { status: 503, .. }));
    assert!(err.is_retryable());
    assert_eq!(err.http_status(), Some(502));
}

#[tokio::test]
async fn unknown_operator_fails_the_operation() {
    let config = OperationConfig {
        filters: vec![Restriction::new("distance", "close to", "1")],
        ..OperationConfig::default()
    };
    let err = run_operation(&stub_pipeline(), &config, json!(null))
        .await
        .unwrap_err();
    assert!(matches!(err, ConduitError::UnknownOperator { ref name } if name == "close to"));
}

#[tokio::test]
async fn non_record_rows_fail_mapping() {
    let pipeline = stores_pipeline(DynUpstream::new(StaticUpstream::new(json!([1, 2]))));
    let err = run_operation(&pipeline, &OperationConfig::default(), json!(null))
        .await
        .unwrap_err();
    assert!(matches!(err, ConduitError::Mapping(_)));
}

#[tokio::test]
async fn retry_wrapper_gives_up_after_budget() {
    let pipeline = stores_pipeline(DynUpstream::new(
        StaticUpstream::new(json!(null)).with_status(500),
    ));
    let config = OperationConfig::default();

    let err = execute_with_retry(
        || run_operation(&pipeline, &config, json!(null)),
        2,
        &BackoffPolicy::None,
        "stores",
    )
    .await
    .unwrap_err();
    match err {
        ConduitError::RetriesExhausted { attempts, last, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, ConduitError::Upstream { status: 500, .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_invocations_are_independent() {
    let pipeline = stores_pipeline(DynUpstream::new(
        StaticUpstream::stub().with_delay(Duration::from_millis(10)),
    ));
    let near = OperationConfig {
        filters: vec![Restriction::new("distance", "less than", "60")],
        ..OperationConfig::default()
    };
    let all = OperationConfig {
        filters: Vec::new(),
        ..OperationConfig::default()
    };

    let default_config = OperationConfig::default();
    let (a, b, c) = tokio::join!(
        run_operation(&pipeline, &near, json!({"caller": "a"})),
        run_operation(&pipeline, &all, json!({"caller": "b"})),
        run_operation(&pipeline, &default_config, json!({"caller": "c"})),
    );

    assert_eq!(distances(&a.unwrap()), vec![50, 10]);
    assert_eq!(distances(&b.unwrap()), vec![100, 50, 220, 10]);
    assert_eq!(distances(&c.unwrap()), vec![100, 50, 10]);
}
