//! Route definitions for the QR menu service.

pub mod health;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Operational router: liveness and readiness checks.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
