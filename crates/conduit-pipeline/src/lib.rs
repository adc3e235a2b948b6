//! Pipeline composition and the stages that run inside it.
//!
//! A [`Pipeline`] threads an [`Envelope`](conduit_types::Envelope) through a
//! sequence of [`Step`]s. The stages here map upstream records through a
//! contract, filter them with symbolic restrictions, and validate the result
//! against a flat interface model. [`stores_pipeline`] wires them into the
//! `/stores` operation.

pub mod filter;
pub mod interface;
pub mod mapper;
pub mod path;
pub mod pipe;
pub mod restriction;
pub mod retry;
pub mod step;
pub mod stores;

pub use filter::{apply_filters, filter_response, restriction_predicate, Predicate};
pub use interface::{interface_violations, is_valid_interface, InterfaceModel, TypeTag, Violation};
pub use mapper::{map_keys_with, map_response, map_rows};
pub use path::set_with;
pub use pipe::{pipe, Pipeline};
pub use restriction::{
    comply_with, satisfies_all, substitute_operators, substitute_operators_with, to_number,
    Comparator, OperatorRegistry, ResolvedRestriction,
};
pub use retry::{execute_with_retry, BackoffPolicy};
pub use step::{async_step, sync_step, AsyncStep, DynStep, Step, SyncStep};
pub use stores::{build_result, compose_request, run_operation, stores_pipeline, FetchStep};
