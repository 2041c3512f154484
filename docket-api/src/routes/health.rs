//! Health check endpoints

use axum::{extract::State, Json};
use docket_store::{SubmissionFilter, SubmissionStore};

use crate::dto::HealthResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    }))
}

/// Ready check endpoint (verifies store connectivity)
pub async fn ready_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let probe = SubmissionFilter {
        limit: 1,
        ..Default::default()
    };
    let status = if state.store.list(probe).await.is_ok() {
        "ready"
    } else {
        "degraded"
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
    }))
}
