//! Pipeline executor: strictly sequential composition of steps.

use std::time::Instant;

use async_trait::async_trait;

use conduit_types::{Envelope, Result};

use crate::step::{DynStep, Step};

/// An ordered list of steps applied one after another.
///
/// Each step sees the envelope produced by the previous one; step N+1 never
/// starts before step N has resolved. The first error stops the run and is
/// returned unchanged. An empty pipeline is the identity.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<DynStep>,
}

/// Compose `steps` into a [`Pipeline`].
pub fn pipe(steps: Vec<DynStep>) -> Pipeline {
    Pipeline { steps }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn then(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(DynStep::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(DynStep::name).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Thread `envelope` through every step in order.
    pub async fn run(&self, envelope: Envelope) -> Result<Envelope> {
        let mut current = envelope;
        for step in &self.steps {
            let started = Instant::now();
            tracing::debug!(step = step.name(), "Step started");
            current = match step.apply(current).await {
                Ok(next) => next,
                Err(err) => {
                    tracing::warn!(step = step.name(), error = %err, "Step failed, aborting pipeline");
                    return Err(err);
                }
            };
            tracing::debug!(
                step = step.name(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Step completed"
            );
        }
        Ok(current)
    }
}

#[async_trait]
impl Step for Pipeline {
    fn name(&self) -> &str {
        "pipeline"
    }

    async fn apply(&self, envelope: Envelope) -> Result<Envelope> {
        self.run(envelope).await
    }
}
