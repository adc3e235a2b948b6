//! Step trait, dynamic dispatch wrapper, and closure adapters.

use std::future::Future;

use async_trait::async_trait;

use conduit_types::{Envelope, Result};

// ---------------------------------------------------------------------------
// Step trait
// ---------------------------------------------------------------------------

/// One stage of a pipeline: consumes an envelope and yields the next one.
#[async_trait]
pub trait Step: Send + Sync {
    /// Identifier used in logs (e.g. "compose_request", "map_response").
    fn name(&self) -> &str;

    /// Produce the next envelope. Returning `Err` aborts the pipeline.
    async fn apply(&self, envelope: Envelope) -> Result<Envelope>;
}

// ---------------------------------------------------------------------------
// DynStep: object-safe wrapper
// ---------------------------------------------------------------------------

pub struct DynStep(Box<dyn Step>);

impl DynStep {
    pub fn new(step: impl Step + 'static) -> Self {
        Self(Box::new(step))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub async fn apply(&self, envelope: Envelope) -> Result<Envelope> {
        self.0.apply(envelope).await
    }
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

/// A step backed by a plain synchronous function.
pub struct SyncStep<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Step for SyncStep<F>
where
    F: Fn(Envelope) -> Result<Envelope> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, envelope: Envelope) -> Result<Envelope> {
        (self.f)(envelope)
    }
}

/// A step backed by a function returning a future.
pub struct AsyncStep<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> Step for AsyncStep<F>
where
    F: Fn(Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Envelope>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, envelope: Envelope) -> Result<Envelope> {
        (self.f)(envelope).await
    }
}

/// Wrap a synchronous `Envelope -> Result<Envelope>` function as a step.
pub fn sync_step<F>(name: impl Into<String>, f: F) -> SyncStep<F>
where
    F: Fn(Envelope) -> Result<Envelope> + Send + Sync,
{
    SyncStep {
        name: name.into(),
        f,
    }
}

/// Wrap an asynchronous `Envelope -> impl Future<Output = Result<Envelope>>` function as a step.
pub fn async_step<F, Fut>(name: impl Into<String>, f: F) -> AsyncStep<F>
where
    F: Fn(Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Envelope>> + Send + 'static,
{
    AsyncStep {
        name: name.into(),
        f,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_types::ConduitError;
    use serde_json::json;

    fn mark(envelope: Envelope) -> Result<Envelope> {
        envelope.with("marked", json!(true))
    }

    #[tokio::test]
    async fn sync_step_applies_function() {
        let step = sync_step("mark", mark);
        assert_eq!(step.name(), "mark");
        let out = step.apply(Envelope::empty()).await.unwrap();
        assert_eq!(out.get("marked"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn async_step_awaits_future() {
        let step = async_step("later", |envelope: Envelope| async move {
            tokio::task::yield_now().await;
            envelope.with("later", json!(1))
        });
        let out = step.apply(Envelope::empty()).await.unwrap();
        assert_eq!(out.get("later"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn dyn_step_forwards_errors() {
        let step = DynStep::new(sync_step("fail", |_env: Envelope| {
            Err(ConduitError::Other("nope".into()))
        }));
        assert_eq!(step.name(), "fail");
        let err = step.apply(Envelope::empty()).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
