//! API Error types
//!
//! Every error renders as a `{error, code}` JSON body. The code
//! distinguishes "duplicate" from "system error" so clients can decide
//! whether a retry makes sense.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docket_ledger::LedgerError;
use docket_pipeline::PipelineError;
use docket_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
            ApiError::Pipeline(e) => pipeline_response(e),
            ApiError::Store(e) => store_response(e),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

fn pipeline_response(e: &PipelineError) -> (StatusCode, &'static str, String) {
    match e {
        PipelineError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        PipelineError::Duplicate(source) => (
            StatusCode::CONFLICT,
            "DUPLICATE",
            format!("identical content already submitted (detected by {source})"),
        ),
        PipelineError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        PipelineError::AlreadyGraded(msg) => {
            (StatusCode::CONFLICT, "ALREADY_GRADED", msg.clone())
        }
        PipelineError::LedgerRecordMissing { .. } => (
            StatusCode::BAD_GATEWAY,
            "LEDGER_RECORD_MISSING",
            e.to_string(),
        ),
        PipelineError::Ledger(LedgerError::Timeout(msg)) => {
            (StatusCode::GATEWAY_TIMEOUT, "LEDGER_TIMEOUT", msg.clone())
        }
        PipelineError::Ledger(other) => (
            StatusCode::BAD_GATEWAY,
            "LEDGER_UNAVAILABLE",
            other.to_string(),
        ),
        PipelineError::Inconsistency { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INCONSISTENCY",
            e.to_string(),
        ),
        PipelineError::Store(other) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            other.to_string(),
        ),
    }
}

fn store_response(e: &StoreError) -> (StatusCode, &'static str, String) {
    match e {
        StoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        StoreError::AlreadyGraded(msg) => (StatusCode::CONFLICT, "ALREADY_GRADED", msg.clone()),
        StoreError::Conflict(msg) => (StatusCode::CONFLICT, "DUPLICATE", msg.clone()),
        StoreError::Storage(msg) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
