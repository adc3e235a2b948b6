//! Shared types, errors, envelope, and configuration for the Conduit pipeline.
//!
//! This crate provides the foundational types used across all other Conduit crates:
//! - `ConduitError`: unified error taxonomy
//! - `Envelope`: immutable JSON carrier threaded through pipeline steps
//! - `Contract`, `Restriction`: declarative rename and bound rules
//! - `OperationConfig`, `ServiceConfig`: static configuration

mod config;
mod envelope;

pub use config::{
    Contract, OperationConfig, Restriction, ServiceConfig, ENV_LISTEN, ENV_UPSTREAM_HOST,
};
pub use envelope::{paths, Envelope};

/// Unified error type for all Conduit subsystems.
#[derive(Debug, thiserror::Error)]
pub enum ConduitError {
    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid envelope path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    // === Pipeline Errors ===
    #[error("Mapping failed: {0}")]
    Mapping(String),

    #[error("Unknown operator '{name}'")]
    UnknownOperator { name: String },

    #[error("Step '{step}' failed: {message}")]
    Step { step: String, message: String },

    #[error("Max retries exhausted for '{operation}' after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: usize,
        #[source]
        last: Box<ConduitError>,
    },

    // === Upstream Errors ===
    #[error("Upstream {upstream} returned HTTP {status}: {message}")]
    Upstream {
        upstream: String,
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Request to {upstream} timed out after {timeout_ms}ms")]
    RequestTimeout { upstream: String, timeout_ms: u64 },

    #[error("Transport error talking to {upstream}: {message}")]
    Transport { upstream: String, message: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ConduitError {
    /// Returns `true` if the error is transient and the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConduitError::RequestTimeout { .. }
                | ConduitError::Transport { .. }
                | ConduitError::Upstream { retryable: true, .. }
        )
    }

    /// Maps the error to an HTTP status code for the serving edge.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ConduitError::Upstream { .. } | ConduitError::Transport { .. } => Some(502),
            ConduitError::RequestTimeout { .. } => Some(504),
            ConduitError::Config(_) | ConduitError::UnknownOperator { .. } => Some(500),
            ConduitError::RetriesExhausted { last, .. } => last.http_status(),
            _ => None,
        }
    }
}

/// A convenience alias for `Result<T, ConduitError>`.
pub type Result<T> = std::result::Result<T, ConduitError>;
