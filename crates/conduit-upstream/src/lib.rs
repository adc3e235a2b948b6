//! Upstream collaborator for the Conduit pipeline.
//!
//! Provides the `Upstream` trait, the `DynUpstream` shared wrapper, the
//! reqwest-backed `HttpUpstream`, and `StaticUpstream` plus the canonical stub
//! store records for offline runs and tests.

mod fixture;
mod http;
mod types;
mod upstream;

pub use fixture::{stub_records, StaticUpstream};
pub use http::HttpUpstream;
pub use types::*;
pub use upstream::*;
