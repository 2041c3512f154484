//! API route handlers

pub mod audit;
pub mod health;
pub mod submissions;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        // Submission endpoints
        .route(
            "/api/v1/submissions",
            post(submissions::submit_submission).get(submissions::list_submissions),
        )
        .route(
            "/api/v1/submissions/:submission_id",
            get(submissions::get_submission),
        )
        .route(
            "/api/v1/submissions/:submission_id/download",
            get(submissions::download_submission),
        )
        // Integrity endpoints
        .route(
            "/api/v1/submissions/:submission_id/verify",
            post(submissions::verify_submission),
        )
        .route(
            "/api/v1/submissions/:submission_id/grade",
            put(submissions::grade_submission),
        )
        // Audit trail
        .route("/api/v1/audit", get(audit::list_audit))
        // State
        .with_state(state)
}
