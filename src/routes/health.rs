//! Health check endpoints for liveness and readiness checks.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::errors::ApiResponse;
use crate::AppState;

/// Readiness check detail.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
}

/// Liveness check: always returns OK if the process is running.
pub async fn live() -> &'static str {
    "OK"
}

/// Readiness check: 200 when the pool reaches the database, 503 with an
/// error envelope otherwise.
pub async fn ready(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::success(HealthStatus {
                status: "ok".to_string(),
                database: "connected".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::error("DATABASE_UNAVAILABLE", &e.to_string()),
            )
        }
    }
}
