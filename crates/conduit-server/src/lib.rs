//! HTTP surface: `GET /stores` backed by the stores pipeline, plus a stub
//! router that plays the upstream service.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};

use conduit_pipeline::{execute_with_retry, run_operation, stores_pipeline, BackoffPolicy, Pipeline};
use conduit_types::{ConduitError, Result, ServiceConfig};
use conduit_upstream::{stub_records, DynUpstream};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServiceConfig>,
    pipeline: Arc<Pipeline>,
    backoff: BackoffPolicy,
}

impl AppState {
    pub fn new(config: ServiceConfig, upstream: DynUpstream) -> Self {
        let backoff = BackoffPolicy::from_millis(config.backoff_ms);
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(stores_pipeline(upstream)),
            backoff,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Routers
// ---------------------------------------------------------------------------

/// The public router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stores", get(get_stores))
        .with_state(state)
}

/// A stand-in for the upstream store service, serving the stub records.
pub fn stub_router() -> Router {
    Router::new().route("/stores", get(|| async { Json(stub_records()) }))
}

/// Bind `addr` and serve `app` until the process is stopped.
pub async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_stores(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let event_body = json!(params);
    let operation = &state.config.operation;

    let outcome = execute_with_retry(
        || run_operation(&state.pipeline, operation, event_body.clone()),
        state.config.max_retries,
        &state.backoff,
        "stores",
    )
    .await;

    match outcome {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &ConduitError) -> Response {
    let status = err
        .http_status()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    tracing::error!(status = status.as_u16(), error = %err, "GET /stores failed");
    (status, Json(error_body(err))).into_response()
}

fn error_body(err: &ConduitError) -> Value {
    json!({ "error": err.to_string() })
}
