//! Store error types

use thiserror::Error;

/// Errors surfaced by the Local Record Store and its collaborators
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint (fingerprint or ledger id) was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The submission already carries a grade
    #[error("Already graded: {0}")]
    AlreadyGraded(String),

    /// Backend failure (database, filesystem)
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
