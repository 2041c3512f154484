//! Mock ledger client for testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use docket_core::{Fingerprint, LedgerRecordId};

use crate::client::{AnchorReceipt, AnchorRequest, LedgerClient, LedgerRecord};
use crate::error::{LedgerError, LedgerResult};

/// In-memory ledger double
///
/// Tracks anchored records, counts submit calls (so tests can assert that a
/// duplicate never reaches the ledger), and offers fail modes plus a tamper
/// helper for reconciliation tests.
pub struct MockLedgerClient {
    records: RwLock<HashMap<u64, LedgerRecord>>,
    next_id: AtomicU64,
    submit_calls: AtomicU64,
    fail_submit: AtomicBool,
    fail_reads: AtomicBool,
    cost_per_anchor: u64,
}

impl MockLedgerClient {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            submit_calls: AtomicU64::new(0),
            fail_submit: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            cost_per_anchor: 21_000,
        }
    }

    /// Make subsequent submits fail
    pub fn set_fail_submit(&self, fail: bool) {
        self.fail_submit.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent read operations fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of submit calls issued so far
    pub fn submit_calls(&self) -> u64 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Overwrite the fingerprint held for a record (simulated tamper)
    pub fn tamper_record(&self, ledger_id: LedgerRecordId, fingerprint: Fingerprint) {
        if let Some(record) = self.records.write().unwrap().get_mut(&ledger_id.0) {
            record.fingerprint = fingerprint;
        }
    }

    /// Drop a record entirely (simulated ledger-side loss)
    pub fn remove_record(&self, ledger_id: LedgerRecordId) {
        self.records.write().unwrap().remove(&ledger_id.0);
    }

    /// Number of anchored records
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

impl Default for MockLedgerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn submit(&self, request: &AnchorRequest) -> LedgerResult<AnchorReceipt> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("mock submit failure".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.write().unwrap().insert(
            id,
            LedgerRecord {
                fingerprint: request.fingerprint,
                owner_ref: request.owner_name.clone(),
                recorded_at: Utc::now(),
            },
        );

        Ok(AnchorReceipt {
            ledger_id: LedgerRecordId(id),
            tx_ref: format!("tx:{id:016x}"),
            block_ref: Some(format!("block:{id}")),
            cost: self.cost_per_anchor,
        })
    }

    async fn check_duplicate(&self, fingerprint: &Fingerprint) -> LedgerResult<bool> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("mock read failure".to_string()));
        }

        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .any(|r| &r.fingerprint == fingerprint))
    }

    async fn read_record(&self, ledger_id: LedgerRecordId) -> LedgerResult<Option<LedgerRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("mock read failure".to_string()));
        }

        Ok(self.records.read().unwrap().get(&ledger_id.0).cloned())
    }

    async fn grade(
        &self,
        ledger_id: LedgerRecordId,
        _grade: u8,
        _feedback: &str,
    ) -> LedgerResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("mock grade failure".to_string()));
        }

        if !self.records.read().unwrap().contains_key(&ledger_id.0) {
            return Err(LedgerError::Rejected(format!(
                "no record {ledger_id} on ledger"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: &[u8]) -> AnchorRequest {
        AnchorRequest {
            owner_name: "Owner One".to_string(),
            title: "Report".to_string(),
            original_name: "report.pdf".to_string(),
            fingerprint: Fingerprint::of(content),
        }
    }

    #[tokio::test]
    async fn submit_then_read_back() {
        let client = MockLedgerClient::new();
        let receipt = client.submit(&request(b"content")).await.unwrap();

        let record = client.read_record(receipt.ledger_id).await.unwrap().unwrap();
        assert_eq!(record.fingerprint, Fingerprint::of(b"content"));
        assert_eq!(client.submit_calls(), 1);
    }

    #[tokio::test]
    async fn duplicate_index_tracks_anchors() {
        let client = MockLedgerClient::new();
        let fp = Fingerprint::of(b"content");

        assert!(!client.check_duplicate(&fp).await.unwrap());
        client.submit(&request(b"content")).await.unwrap();
        assert!(client.check_duplicate(&fp).await.unwrap());
    }

    #[tokio::test]
    async fn fail_modes() {
        let client = MockLedgerClient::new();
        client.set_fail_submit(true);
        assert!(client.submit(&request(b"x")).await.is_err());

        client.set_fail_submit(false);
        let receipt = client.submit(&request(b"x")).await.unwrap();

        client.set_fail_reads(true);
        assert!(client.read_record(receipt.ledger_id).await.is_err());
    }

    #[tokio::test]
    async fn tamper_changes_read_back() {
        let client = MockLedgerClient::new();
        let receipt = client.submit(&request(b"original")).await.unwrap();

        client.tamper_record(receipt.ledger_id, Fingerprint::of(b"tampered"));
        let record = client.read_record(receipt.ledger_id).await.unwrap().unwrap();
        assert_eq!(record.fingerprint, Fingerprint::of(b"tampered"));
    }

    #[tokio::test]
    async fn grade_requires_existing_record() {
        let client = MockLedgerClient::new();
        let err = client
            .grade(LedgerRecordId(999), 80, "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
    }
}
