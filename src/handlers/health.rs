// handlers/health.rs - GET /api/v1/health

use axum::extract::State;
use chrono::Utc;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{ApiError, AppResult};
use crate::middleware::ApiResponse;

/// Liveness plus a store round trip.
pub async fn check(State(state): State<AppState>) -> AppResult<ApiResponse<Value>> {
    if let Err(e) = state.store.ping().await {
        tracing::error!("health check failed: {}", e);
        return Err(ApiError::service_unavailable("Database unavailable").into());
    }

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
