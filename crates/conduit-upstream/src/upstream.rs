use std::sync::Arc;

use async_trait::async_trait;
use conduit_types::Result;

use crate::{UpstreamRequest, UpstreamResponse};

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

/// The network collaborator behind the fetch step.
///
/// Implementations own transport concerns (timeouts, connection reuse); a
/// non-success status must surface as an error, never as a response.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse>;
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// DynUpstream
// ---------------------------------------------------------------------------

/// Cheaply cloneable handle to an upstream shared across requests.
#[derive(Clone)]
pub struct DynUpstream(Arc<dyn Upstream>);

impl DynUpstream {
    pub fn new(upstream: impl Upstream + 'static) -> Self {
        Self(Arc::new(upstream))
    }

    pub async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        self.0.send(request).await
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl std::fmt::Debug for DynUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DynUpstream").field(&self.name()).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
