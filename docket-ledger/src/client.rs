//! Ledger client trait and wire types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docket_core::{Fingerprint, LedgerRecordId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerResult;

/// Fields anchored on the ledger for one submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorRequest {
    pub owner_name: String,
    pub title: String,
    pub original_name: String,
    pub fingerprint: Fingerprint,
}

/// Provenance of a successful anchoring transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorReceipt {
    /// Identifier assigned by the ledger; unique, never reused
    pub ledger_id: LedgerRecordId,
    /// Transaction reference
    pub tx_ref: String,
    /// Block reference, when already known at submit time
    pub block_ref: Option<String>,
    /// Cost charged for the anchor
    pub cost: u64,
}

/// A record as the ledger holds it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub fingerprint: Fingerprint,
    pub owner_ref: String,
    pub recorded_at: DateTime<Utc>,
}

/// Gateway to the external append-only ledger
///
/// `submit` is an irreversible, paid, potentially slow remote call. The
/// client never retries it on its own: a blind retry would either be
/// rejected by the ledger as a duplicate or create an unwanted second
/// anchor. Retrying is the coordinator's explicit decision.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Anchor a fingerprint; returns the ledger identifiers on success
    async fn submit(&self, request: &AnchorRequest) -> LedgerResult<AnchorReceipt>;

    /// Read-only query against the ledger-side duplicate index
    ///
    /// Second line of defense beyond the local store: the ledger is the
    /// ultimate source of truth and retains history even when the local
    /// store was reset or bypassed.
    async fn check_duplicate(&self, fingerprint: &Fingerprint) -> LedgerResult<bool>;

    /// Fetch the anchored record; `None` when the ledger holds no such id
    async fn read_record(&self, ledger_id: LedgerRecordId) -> LedgerResult<Option<LedgerRecord>>;

    /// Mirror the grade on the ledger
    ///
    /// Called before the local store is marked graded, so a crash between
    /// the two leaves the ledger as the authoritative record.
    async fn grade(&self, ledger_id: LedgerRecordId, grade: u8, feedback: &str)
        -> LedgerResult<()>;
}
