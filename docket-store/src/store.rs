//! Storage traits
//!
//! Defines the interfaces the pipeline depends on. This abstraction allows
//! for different implementations:
//! - SQLite (durable, production)
//! - In-memory (tests, degraded deployments)

use async_trait::async_trait;
use docket_core::{
    ActorId, AuditEntry, Fingerprint, GradeRecord, LedgerRecordId, Submission, SubmissionId,
    SubmissionStatus, VerificationAttempt,
};

use crate::error::StoreResult;

/// Query options for submission listings
///
/// Results are always ordered by submission time, newest first.
#[derive(Debug, Clone)]
pub struct SubmissionFilter {
    pub owner: Option<ActorId>,
    pub status: Option<SubmissionStatus>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for SubmissionFilter {
    fn default() -> Self {
        Self {
            owner: None,
            status: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// Durable mapping from fingerprint to Submission
///
/// The fingerprint uniqueness invariant is enforced atomically at this
/// layer, not by a check-then-insert sequence in the caller: two concurrent
/// creates for the same content must not both succeed.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a new submission
    ///
    /// Fails with `Conflict` when the fingerprint or ledger id already
    /// exists.
    async fn create(&self, submission: &Submission) -> StoreResult<()>;

    /// Fetch a submission by its local identifier
    async fn get(&self, id: &SubmissionId) -> StoreResult<Option<Submission>>;

    /// Pre-ledger duplicate short-circuit
    async fn find_by_fingerprint(&self, fingerprint: &Fingerprint)
        -> StoreResult<Option<Submission>>;

    /// Lookup by the ledger-assigned identifier
    async fn find_by_ledger_id(&self, ledger_id: LedgerRecordId)
        -> StoreResult<Option<Submission>>;

    /// List submissions, newest first
    async fn list(&self, filter: SubmissionFilter) -> StoreResult<Vec<Submission>>;

    /// Atomically append a verification attempt to the history
    ///
    /// Never a whole-record overwrite; concurrent appends must both land.
    async fn append_verification_attempt(
        &self,
        id: &SubmissionId,
        attempt: &VerificationAttempt,
    ) -> StoreResult<()>;

    /// One-time grade application, moving the status to `graded`
    ///
    /// Fails with `AlreadyGraded` when a grade exists and `NotFound` when
    /// the submission is absent. Returns the updated record.
    async fn apply_grade(&self, id: &SubmissionId, grade: &GradeRecord)
        -> StoreResult<Submission>;
}

/// Append-only audit log keyed by timestamp
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Append one entry
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()>;

    /// List entries, newest first
    async fn entries(&self, limit: u32, offset: u32) -> StoreResult<Vec<AuditEntry>>;
}

/// Byte-addressable blob store
///
/// Content-type and size validation happen before the pipeline is invoked;
/// this interface only moves bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist a blob and return an opaque locator
    async fn store(&self, bytes: &[u8]) -> StoreResult<String>;

    /// Read a blob back by locator
    async fn read(&self, locator: &str) -> StoreResult<Vec<u8>>;

    /// Delete a blob; deleting an absent locator is not an error
    async fn delete(&self, locator: &str) -> StoreResult<()>;
}
