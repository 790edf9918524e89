//! tapgrid-api — the HTTP surface the grid simulator talks to.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/calculateControl/` | Evaluate a grid snapshot, return a control decision |
//! | GET | `/heartbeat/` | Liveness check (`{"is_alive": true}`) |
//!
//! Both routes also answer without the trailing slash.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tap_core::Controller;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<Controller>,
}

/// Build the complete API router.
pub fn build_router(controller: Arc<Controller>) -> Router {
    let state = ApiState { controller };

    Router::new()
        .route("/calculateControl/", post(handlers::calculate_control))
        .route("/calculateControl", post(handlers::calculate_control))
        .route("/heartbeat/", get(handlers::heartbeat))
        .route("/heartbeat", get(handlers::heartbeat))
        .with_state(state)
}
