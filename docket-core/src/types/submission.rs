//! Submission record and status machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::fingerprint::Fingerprint;

/// Submission identifier (UUID v4, assigned locally)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned by the ledger on successful anchoring
///
/// Unique, set exactly once, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerRecordId(pub u64);

impl fmt::Display for LedgerRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Actor identifier supplied by the external identity layer
///
/// Role enforcement (student submits, lecturer verifies/grades) happens
/// before the pipeline is invoked; this is an opaque reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Submission lifecycle status
///
/// Transitions are monotonic forward only; `Graded` and `Rejected` are
/// terminal. A record is only ever created after a successful ledger anchor,
/// so `Pending` never reaches the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Anchored,
    Submitted,
    Graded,
    Rejected,
}

/// Attempted status transition violates the forward-only rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Anchored => "anchored",
            Self::Submitted => "submitted",
            Self::Graded => "graded",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "anchored" => Some(Self::Anchored),
            "submitted" => Some(Self::Submitted),
            "graded" => Some(Self::Graded),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Graded | Self::Rejected)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Anchored => 1,
            Self::Submitted => 2,
            Self::Graded => 3,
            Self::Rejected => 3,
        }
    }

    /// Check whether a forward transition to `next` is allowed
    pub fn can_transition_to(&self, next: Self) -> bool {
        !self.is_terminal() && *self != next && next.rank() > self.rank()
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a single verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Success,
    Failed,
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One entry in a submission's verification history
///
/// Both fingerprints are recorded even on success, to keep a full forensic
/// trail. Entries are never mutated or pruned once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub verifier_id: ActorId,
    pub attempted_at: DateTime<Utc>,
    pub outcome: VerificationOutcome,
    pub ledger_fingerprint: Fingerprint,
    pub local_fingerprint: Fingerprint,
}

/// Grading fields, present only after the one-time grade operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRecord {
    /// Score in 0..=100
    pub grade: u8,
    pub feedback: Option<String>,
    pub grader_id: ActorId,
    pub graded_at: DateTime<Utc>,
}

/// The central record of the pipeline
///
/// Created by the Submission Coordinator after a successful ledger anchor;
/// mutated only by appending verification attempts and by the one-time grade
/// operation. Never physically deleted by normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    /// Content fingerprint; unique across all submissions, immutable
    pub fingerprint: Fingerprint,
    /// Ledger-assigned identifier; unique, set exactly once
    pub ledger_id: LedgerRecordId,
    /// Transaction reference of the anchoring call
    pub ledger_tx_ref: String,
    /// Block reference of the anchoring call, when known
    pub ledger_block_ref: Option<String>,
    /// Cost charged by the ledger for the anchor
    pub ledger_cost: u64,
    pub owner_id: ActorId,
    pub owner_name: String,
    pub title: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
    /// Opaque locator into the blob store
    pub blob_locator: String,
    pub status: SubmissionStatus,
    pub grade: Option<GradeRecord>,
    pub verification_history: Vec<VerificationAttempt>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// Move the status forward, enforcing the monotonic transition rule
    pub fn transition_to(&mut self, next: SubmissionStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }
}
