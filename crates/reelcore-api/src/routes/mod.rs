//! API routes.

pub mod health;
pub mod workflows;

use crate::AppState;
use axum::Router;

/// Build the main API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(workflows::router())
        .with_state(state)
}
