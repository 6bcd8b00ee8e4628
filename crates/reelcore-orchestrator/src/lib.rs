//! Orchestration API core (spec §4.8): the full create/incremental/retry
//! protocol, independent of any HTTP framework. `reelcore-api` binds this
//! to `axum`.

pub mod protocol;

pub use protocol::{handle_request, WorkflowRequest, WorkflowResponse};
