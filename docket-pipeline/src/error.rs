//! Pipeline error taxonomy
//!
//! Duplicate rejection is a business outcome, not a system fault; the two
//! are kept apart so callers can decide whether a retry makes sense. The
//! inconsistency variant marks the one unrecoverable partial-failure window
//! (ledger anchored, local persist failed) and is never silently swallowed.

use docket_ledger::LedgerError;
use docket_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Which duplicate check rejected the submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateSource {
    /// The local record store already holds this fingerprint
    LocalStore,
    /// The ledger-side duplicate index already holds this fingerprint
    Ledger,
    /// The store's unique constraint fired at persist time, after the
    /// anchor was already paid for (the accepted narrow race)
    PersistRace,
}

impl fmt::Display for DuplicateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LocalStore => "local store",
            Self::Ledger => "ledger",
            Self::PersistRace => "persist race",
        };
        write!(f, "{s}")
    }
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed input; fails before any state change
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Identical content was already submitted (business outcome)
    #[error("Duplicate content detected by {0}")]
    Duplicate(DuplicateSource),

    /// No submission with the given identifier
    #[error("Submission not found: {0}")]
    NotFound(String),

    /// The submission already carries a grade
    #[error("Submission already graded: {0}")]
    AlreadyGraded(String),

    /// The ledger no longer holds the record this submission anchors to
    ///
    /// A tamper signal in its own right, surfaced distinctly from network
    /// failures.
    #[error("Ledger record {ledger_id} missing for submission {submission_id}")]
    LedgerRecordMissing {
        submission_id: String,
        ledger_id: u64,
    },

    /// Local record store failure
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Ledger call failure, surfaced verbatim
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Ledger anchored but the local persist failed: the ledger now has an
    /// anchor with no local shadow. Fatal; requires manual reconciliation.
    #[error(
        "Inconsistency: anchored on ledger as record {ledger_id} \
         (fingerprint {fingerprint}) but local persist failed: {source_detail}"
    )]
    Inconsistency {
        ledger_id: u64,
        fingerprint: String,
        source_detail: String,
    },
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PipelineError::NotFound(what),
            StoreError::AlreadyGraded(what) => PipelineError::AlreadyGraded(what),
            other => PipelineError::Store(other),
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
