//! Docket Ledger Client
//!
//! Gateway to the external append-only ledger that anchors content
//! fingerprints. Four logical operations: submit, duplicate check, record
//! read, and grade. The wire schema belongs to the ledger deployment; only
//! the operation contracts are fixed here.
//!
//! This abstraction allows for different implementations:
//! - HTTP client (remote ledger API)
//! - Mock client (testing)

pub mod client;
pub mod error;
pub mod http;
pub mod mock;

pub use client::{AnchorReceipt, AnchorRequest, LedgerClient, LedgerRecord};
pub use error::{LedgerError, LedgerResult};
pub use http::{HttpLedgerClient, RetryConfig};
pub use mock::MockLedgerClient;
