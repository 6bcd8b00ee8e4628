//! HTTP surface over the orchestration core (spec §6): a thin `axum`
//! binding over `reelcore_orchestrator::handle_request`.

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;
