//! The `/stores` operation: compose, fetch, map, filter, finalize.

use async_trait::async_trait;
use serde_json::{json, Value};

use conduit_types::{paths, ConduitError, Envelope, OperationConfig, Result};
use conduit_upstream::{DynUpstream, UpstreamRequest};

use crate::filter::filter_response;
use crate::mapper::map_response;
use crate::pipe::Pipeline;
use crate::step::{sync_step, Step};

/// Derive `data.request` from `data.config`.
pub fn compose_request(envelope: Envelope) -> Result<Envelope> {
    let config = envelope.config()?;
    if config.host.trim().is_empty() {
        return Err(ConduitError::Config("operation host is empty".into()));
    }
    let request = UpstreamRequest::from_config(&config);
    envelope.with(paths::REQUEST, serde_json::to_value(request)?)
}

/// Sends `data.request` upstream and stores the reply under `data.response`.
pub struct FetchStep {
    upstream: DynUpstream,
}

impl FetchStep {
    pub fn new(upstream: DynUpstream) -> Self {
        Self { upstream }
    }
}

#[async_trait]
impl Step for FetchStep {
    fn name(&self) -> &str {
        "perform_request"
    }

    async fn apply(&self, envelope: Envelope) -> Result<Envelope> {
        let raw = envelope.get(paths::REQUEST).ok_or_else(|| ConduitError::Step {
            step: self.name().into(),
            message: "envelope has no data.request; compose the request first".into(),
        })?;
        let request: UpstreamRequest = serde_json::from_value(raw.clone())?;

        tracing::info!(upstream = self.upstream.name(), uri = %request.uri, "Fetching upstream");
        let response = self.upstream.send(&request).await?;
        tracing::info!(upstream = self.upstream.name(), status = response.status, "Upstream replied");

        envelope.with(paths::RESPONSE, serde_json::to_value(response)?)
    }
}

/// Expose `data.mapped_response` as `result = { data, metadata }`.
pub fn build_result(envelope: Envelope) -> Result<Envelope> {
    let data = envelope
        .get(paths::MAPPED_RESPONSE)
        .cloned()
        .ok_or_else(|| ConduitError::Step {
            step: "build_result".into(),
            message: "envelope has no mapped response".into(),
        })?;
    envelope.with(paths::RESULT, json!({ "data": data, "metadata": {} }))
}

/// The five `/stores` steps in order.
pub fn stores_pipeline(upstream: DynUpstream) -> Pipeline {
    Pipeline::new()
        .then(sync_step("compose_request", compose_request))
        .then(FetchStep::new(upstream))
        .then(sync_step("map_response", map_response))
        .then(sync_step("filter_response", filter_response))
        .then(sync_step("build_result", build_result))
}

/// Build an envelope for one request, run `pipeline`, and return `result`.
pub async fn run_operation(
    pipeline: &Pipeline,
    config: &OperationConfig,
    event_body: Value,
) -> Result<Value> {
    let envelope = Envelope::new(event_body, config)?;
    let finished = pipeline.run(envelope).await?;
    finished
        .get(paths::RESULT)
        .cloned()
        .ok_or_else(|| ConduitError::Other("pipeline finished without a result".into()))
}
