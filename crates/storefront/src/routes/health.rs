//! Liveness and readiness probes.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::kv::KvStore;
use crate::models::ApiResponse;
use crate::state::AppState;

/// Reachability of each dependency.
#[derive(Debug, Serialize)]
pub struct ReadinessPayload {
    pub database: bool,
    pub kv: bool,
    pub kv_backend: &'static str,
}

/// Liveness health check endpoint.
///
/// Returns OK if the server is running. Does not check dependencies.
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::done("ok"))
}

/// Readiness health check endpoint.
///
/// Verifies database and key-value store connectivity.
/// Returns 503 Service Unavailable if either is not reachable.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness: database unreachable");
            false
        }
    };
    let kv = match state.kv().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness: key-value store unreachable");
            false
        }
    };

    let payload = ReadinessPayload {
        database,
        kv,
        kv_backend: state.kv().name(),
    };
    if database && kv {
        (StatusCode::OK, Json(ApiResponse::ok("ready", payload)))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::failed("not ready", payload)),
        )
    }
}
