//! Audit trail entries
//!
//! One entry per state-changing coordinator/reconciler/grading outcome.
//! Entries are append-only; no edit or delete operation exists anywhere in
//! the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard audit action names
pub mod actions {
    pub const SUBMISSION_RECORDED: &str = "submission_recorded";
    pub const SUBMISSION_REJECTED_DUPLICATE: &str = "submission_rejected_duplicate";
    pub const SUBMISSION_FAILED: &str = "submission_failed";
    pub const VERIFICATION_SUCCESS: &str = "verification_success";
    pub const VERIFICATION_FAILED: &str = "verification_failed";
    pub const SUBMISSION_GRADED: &str = "submission_graded";
}

/// One append-only audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Identity the entry is attributed to
    pub actor: String,
    /// Action name, one of [`actions`]
    pub action: String,
    /// Human-readable detail line
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}
