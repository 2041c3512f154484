//! Data Transfer Objects for API requests and responses

use chrono::{DateTime, Utc};
use docket_core::{GradeRecord, Submission, VerificationAttempt};
use serde::{Deserialize, Serialize};

// ============ Submission DTOs ============

/// Submission response
///
/// The blob locator is deliberately not exposed; clients fetch content
/// through the download endpoint only.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: String,
    pub fingerprint: String,
    pub ledger_id: u64,
    pub ledger_tx_ref: String,
    pub ledger_block_ref: Option<String>,
    pub ledger_cost: u64,
    pub owner_id: String,
    pub owner_name: String,
    pub title: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
    pub status: String,
    pub grade: Option<GradeResponse>,
    pub verification_history: Vec<VerificationAttemptResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Grading fields
#[derive(Debug, Serialize)]
pub struct GradeResponse {
    pub grade: u8,
    pub feedback: Option<String>,
    pub grader_id: String,
    pub graded_at: DateTime<Utc>,
}

/// One verification attempt
#[derive(Debug, Serialize)]
pub struct VerificationAttemptResponse {
    pub verifier_id: String,
    pub attempted_at: DateTime<Utc>,
    pub outcome: String,
    pub ledger_fingerprint: String,
    pub local_fingerprint: String,
}

/// Verify request
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Verifier identity, role-checked upstream
    pub verifier_id: String,
}

/// Grade request
#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    /// Score in 0..=100
    pub grade: u8,
    pub feedback: Option<String>,
    /// Grader identity, role-checked upstream
    pub grader_id: String,
}

// ============ Audit DTOs ============

/// One audit trail entry
#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

// ============ Health DTOs ============

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ============ Pagination ============

/// Query parameters for list endpoints
#[derive(Debug, Deserialize, Default)]
pub struct ListQueryParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    pub owner_id: Option<String>,
    pub status: Option<String>,
}

fn default_limit() -> u32 {
    100
}

// ============ Helpers ============

pub fn submission_to_response(submission: &Submission) -> SubmissionResponse {
    SubmissionResponse {
        id: submission.id.0.clone(),
        fingerprint: submission.fingerprint.to_hex(),
        ledger_id: submission.ledger_id.0,
        ledger_tx_ref: submission.ledger_tx_ref.clone(),
        ledger_block_ref: submission.ledger_block_ref.clone(),
        ledger_cost: submission.ledger_cost,
        owner_id: submission.owner_id.0.clone(),
        owner_name: submission.owner_name.clone(),
        title: submission.title.clone(),
        original_name: submission.original_name.clone(),
        size: submission.size,
        mime_type: submission.mime_type.clone(),
        status: submission.status.as_str().to_string(),
        grade: submission.grade.as_ref().map(grade_to_response),
        verification_history: submission
            .verification_history
            .iter()
            .map(attempt_to_response)
            .collect(),
        created_at: submission.created_at,
        updated_at: submission.updated_at,
    }
}

pub fn grade_to_response(grade: &GradeRecord) -> GradeResponse {
    GradeResponse {
        grade: grade.grade,
        feedback: grade.feedback.clone(),
        grader_id: grade.grader_id.0.clone(),
        graded_at: grade.graded_at,
    }
}

pub fn attempt_to_response(attempt: &VerificationAttempt) -> VerificationAttemptResponse {
    VerificationAttemptResponse {
        verifier_id: attempt.verifier_id.0.clone(),
        attempted_at: attempt.attempted_at,
        outcome: attempt.outcome.as_str().to_string(),
        ledger_fingerprint: attempt.ledger_fingerprint.to_hex(),
        local_fingerprint: attempt.local_fingerprint.to_hex(),
    }
}
