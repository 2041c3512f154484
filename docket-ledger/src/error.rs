//! Ledger client error types

use thiserror::Error;

/// Errors surfaced by ledger operations
///
/// Timeouts are distinguished from other failures because the caller's
/// policy differs: a timed-out submit may or may not have anchored, and must
/// never be blindly retried.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The request did not complete within the configured deadline
    #[error("Ledger timeout: {0}")]
    Timeout(String),

    /// The ledger was unreachable or answered outside its contract
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused the operation
    #[error("Ledger rejected the operation: {0}")]
    Rejected(String),

    /// The ledger answered but the payload could not be interpreted
    #[error("Invalid ledger response: {0}")]
    InvalidResponse(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
