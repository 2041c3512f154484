//! Submission Coordinator
//!
//! Drives one submission attempt through
//! fingerprint -> duplicate check (local, then ledger) -> anchor -> record,
//! with rollback of partial work on failure. All duplicate checks and
//! validation fail before any ledger spend; a ledger anchor is only ever
//! paid for content that passed both checks.
//!
//! Once the ledger submit call has been issued the operation runs to
//! completion or explicit failure; an in-flight ledger transaction cannot be
//! safely aborted by the client.

use std::sync::Arc;

use chrono::Utc;
use docket_core::{
    actions, ActorId, AuditEntry, Fingerprint, Submission, SubmissionId, SubmissionStatus,
};
use docket_ledger::{AnchorRequest, LedgerClient};
use docket_store::{AuditTrail, BlobStore, StoreError, SubmissionStore};
use tracing::{error, info, warn};

use crate::error::{DuplicateSource, PipelineError, PipelineResult};

/// One submission attempt
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub owner_id: ActorId,
    pub owner_name: String,
    pub title: String,
    pub original_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Orchestrates the submission pipeline
pub struct SubmissionCoordinator {
    store: Arc<dyn SubmissionStore>,
    audit: Arc<dyn AuditTrail>,
    ledger: Arc<dyn LedgerClient>,
    blobs: Arc<dyn BlobStore>,
}

impl SubmissionCoordinator {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        audit: Arc<dyn AuditTrail>,
        ledger: Arc<dyn LedgerClient>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            store,
            audit,
            ledger,
            blobs,
        }
    }

    /// Run one submission attempt to completion
    pub async fn submit(&self, request: SubmitRequest) -> PipelineResult<Submission> {
        validate(&request)?;

        let fingerprint = Fingerprint::of(&request.content);

        // Local duplicate short-circuit: no ledger cost on a doomed
        // duplicate.
        if let Some(existing) = self.store.find_by_fingerprint(&fingerprint).await? {
            info!(
                fingerprint = %fingerprint,
                existing_id = %existing.id,
                "Submission rejected: fingerprint already recorded locally"
            );
            self.audit_rejection(&request, &fingerprint).await;
            return Err(PipelineError::Duplicate(DuplicateSource::LocalStore));
        }

        // The ledger retains history even when the local store was reset or
        // bypassed.
        if self.ledger.check_duplicate(&fingerprint).await? {
            info!(
                fingerprint = %fingerprint,
                "Submission rejected: fingerprint already anchored on ledger"
            );
            self.audit_rejection(&request, &fingerprint).await;
            return Err(PipelineError::Duplicate(DuplicateSource::Ledger));
        }

        let locator = self.blobs.store(&request.content).await?;

        let anchor = AnchorRequest {
            owner_name: request.owner_name.clone(),
            title: request.title.clone(),
            original_name: request.original_name.clone(),
            fingerprint,
        };
        let receipt = match self.ledger.submit(&anchor).await {
            Ok(receipt) => receipt,
            Err(e) => {
                // No anchor, no record: discard the blob and surface the
                // ledger failure verbatim.
                if let Err(del) = self.blobs.delete(&locator).await {
                    warn!(locator = %locator, error = %del, "Failed to discard blob");
                }
                error!(fingerprint = %fingerprint, error = %e, "Ledger submit failed");
                return Err(e.into());
            }
        };

        let now = Utc::now();
        let submission = Submission {
            id: SubmissionId::generate(),
            fingerprint,
            ledger_id: receipt.ledger_id,
            ledger_tx_ref: receipt.tx_ref,
            ledger_block_ref: receipt.block_ref,
            ledger_cost: receipt.cost,
            owner_id: request.owner_id.clone(),
            owner_name: request.owner_name.clone(),
            title: request.title.clone(),
            original_name: request.original_name.clone(),
            size: request.content.len() as u64,
            mime_type: request.mime_type.clone(),
            blob_locator: locator.clone(),
            status: SubmissionStatus::Anchored,
            grade: None,
            verification_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        match self.store.create(&submission).await {
            Ok(()) => {}
            Err(StoreError::Conflict(detail)) => {
                // A concurrent identical submission won the unique
                // constraint after this one already anchored. The anchor
                // cost is spent; the record stays with the winner.
                warn!(
                    fingerprint = %fingerprint,
                    ledger_id = %receipt.ledger_id,
                    detail = %detail,
                    "Duplicate at persist time; ledger cost already spent"
                );
                if let Err(del) = self.blobs.delete(&locator).await {
                    warn!(locator = %locator, error = %del, "Failed to discard blob");
                }
                self.audit_rejection(&request, &fingerprint).await;
                return Err(PipelineError::Duplicate(DuplicateSource::PersistRace));
            }
            Err(other) => {
                // The ledger holds an anchor with no local shadow. The blob
                // is retained so manual reconciliation has the content.
                error!(
                    fingerprint = %fingerprint,
                    ledger_id = %receipt.ledger_id,
                    blob_locator = %locator,
                    error = %other,
                    "Ledger anchored but local persist failed; manual reconciliation required"
                );
                return Err(PipelineError::Inconsistency {
                    ledger_id: receipt.ledger_id.0,
                    fingerprint: fingerprint.to_hex(),
                    source_detail: other.to_string(),
                });
            }
        }

        let entry = AuditEntry::new(
            request.owner_name.clone(),
            actions::SUBMISSION_RECORDED,
            format!(
                "{} anchored as ledger record {} with fingerprint {}",
                submission.title, submission.ledger_id, submission.fingerprint
            ),
        );
        if let Err(e) = self.audit.append(&entry).await {
            warn!(error = %e, "Failed to append audit entry");
        }

        info!(
            submission_id = %submission.id,
            fingerprint = %submission.fingerprint,
            ledger_id = %submission.ledger_id,
            size = submission.size,
            "Submission recorded"
        );

        Ok(submission)
    }

    async fn audit_rejection(&self, request: &SubmitRequest, fingerprint: &Fingerprint) {
        let entry = AuditEntry::new(
            request.owner_name.clone(),
            actions::SUBMISSION_REJECTED_DUPLICATE,
            format!(
                "{} rejected: fingerprint {} already submitted",
                request.title, fingerprint
            ),
        );
        if let Err(e) = self.audit.append(&entry).await {
            warn!(error = %e, "Failed to append audit entry");
        }
    }
}

fn validate(request: &SubmitRequest) -> PipelineResult<()> {
    if request.title.trim().is_empty() {
        return Err(PipelineError::Validation("title must not be empty".to_string()));
    }
    if request.owner_id.0.trim().is_empty() {
        return Err(PipelineError::Validation("owner id must not be empty".to_string()));
    }
    if request.owner_name.trim().is_empty() {
        return Err(PipelineError::Validation(
            "owner name must not be empty".to_string(),
        ));
    }
    if request.content.is_empty() {
        return Err(PipelineError::Validation("content must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docket_core::{GradeRecord, LedgerRecordId, VerificationAttempt};
    use docket_ledger::MockLedgerClient;
    use docket_store::{MemoryBlobStore, MemoryStore, StoreResult, SubmissionFilter};

    fn request(content: &[u8]) -> SubmitRequest {
        SubmitRequest {
            owner_id: ActorId::new("student-1"),
            owner_name: "John Student".to_string(),
            title: "Weekly report".to_string(),
            original_name: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            content: content.to_vec(),
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        ledger: Arc<MockLedgerClient>,
        blobs: Arc<MemoryBlobStore>,
        coordinator: SubmissionCoordinator,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MockLedgerClient::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let coordinator = SubmissionCoordinator::new(
            store.clone(),
            store.clone(),
            ledger.clone(),
            blobs.clone(),
        );
        Fixture {
            store,
            ledger,
            blobs,
            coordinator,
        }
    }

    #[tokio::test]
    async fn submit_records_and_audits() {
        let f = fixture();

        let submission = f.coordinator.submit(request(b"report-v1")).await.unwrap();
        assert_eq!(submission.status, SubmissionStatus::Anchored);
        assert_eq!(submission.fingerprint, Fingerprint::of(b"report-v1"));
        assert_eq!(submission.ledger_id, LedgerRecordId(1));
        assert_eq!(submission.size, 9);

        let stored = f.store.get(&submission.id).await.unwrap().unwrap();
        assert_eq!(stored.fingerprint, submission.fingerprint);

        let blob = f.blobs.read(&submission.blob_locator).await.unwrap();
        assert_eq!(blob, b"report-v1");

        let audit = f.store.entries(10, 0).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, actions::SUBMISSION_RECORDED);
    }

    #[tokio::test]
    async fn identical_resubmission_is_rejected_without_ledger_call() {
        let f = fixture();

        f.coordinator.submit(request(b"report-v1")).await.unwrap();
        let err = f.coordinator.submit(request(b"report-v1")).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Duplicate(DuplicateSource::LocalStore)
        ));
        // No second ledger call, no second blob, no second record.
        assert_eq!(f.ledger.submit_calls(), 1);
        assert_eq!(f.blobs.len().await, 1);
        let all = f.store.list(SubmissionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn ledger_side_duplicate_is_rejected() {
        let f = fixture();

        // Anchor directly on the ledger, bypassing the local store (the
        // store-was-reset scenario).
        f.ledger
            .submit(&AnchorRequest {
                owner_name: "someone".to_string(),
                title: "earlier".to_string(),
                original_name: "earlier.pdf".to_string(),
                fingerprint: Fingerprint::of(b"report-v1"),
            })
            .await
            .unwrap();

        let err = f.coordinator.submit(request(b"report-v1")).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Duplicate(DuplicateSource::Ledger)
        ));
        assert_eq!(f.ledger.submit_calls(), 1);
        assert!(f.blobs.is_empty().await);
        assert!(f
            .store
            .list(SubmissionFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn ledger_submit_failure_leaves_no_local_state() {
        let f = fixture();
        f.ledger.set_fail_submit(true);

        let err = f.coordinator.submit(request(b"report-v1")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ledger(_)));

        assert!(f
            .store
            .list(SubmissionFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(f.blobs.is_empty().await);
    }

    #[tokio::test]
    async fn validation_fails_before_any_side_effect() {
        let f = fixture();

        let mut bad = request(b"content");
        bad.title = "  ".to_string();
        let err = f.coordinator.submit(bad).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(f.ledger.submit_calls(), 0);
        assert!(f.blobs.is_empty().await);

        let empty = SubmitRequest {
            content: Vec::new(),
            ..request(b"")
        };
        assert!(matches!(
            f.coordinator.submit(empty).await.unwrap_err(),
            PipelineError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_identical_submissions_admit_exactly_one() {
        let f = fixture();
        let coordinator = Arc::new(f.coordinator);

        let c1 = Arc::clone(&coordinator);
        let c2 = Arc::clone(&coordinator);
        let (r1, r2) = tokio::join!(
            async move { c1.submit(request(b"raced content")).await },
            async move { c2.submit(request(b"raced content")).await },
        );

        let results = [r1, r2];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(PipelineError::Duplicate(_))))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(rejected, 1);

        let all = f.store.list(SubmissionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    /// Store double whose create always fails after the anchor succeeded.
    struct FailingCreateStore(MemoryStore);

    #[async_trait]
    impl SubmissionStore for FailingCreateStore {
        async fn create(&self, _submission: &Submission) -> StoreResult<()> {
            Err(StoreError::Storage("disk full".to_string()))
        }
        async fn get(&self, id: &SubmissionId) -> StoreResult<Option<Submission>> {
            self.0.get(id).await
        }
        async fn find_by_fingerprint(
            &self,
            fingerprint: &Fingerprint,
        ) -> StoreResult<Option<Submission>> {
            self.0.find_by_fingerprint(fingerprint).await
        }
        async fn find_by_ledger_id(
            &self,
            ledger_id: LedgerRecordId,
        ) -> StoreResult<Option<Submission>> {
            self.0.find_by_ledger_id(ledger_id).await
        }
        async fn list(&self, filter: SubmissionFilter) -> StoreResult<Vec<Submission>> {
            self.0.list(filter).await
        }
        async fn append_verification_attempt(
            &self,
            id: &SubmissionId,
            attempt: &VerificationAttempt,
        ) -> StoreResult<()> {
            self.0.append_verification_attempt(id, attempt).await
        }
        async fn apply_grade(
            &self,
            id: &SubmissionId,
            grade: &GradeRecord,
        ) -> StoreResult<Submission> {
            self.0.apply_grade(id, grade).await
        }
    }

    #[tokio::test]
    async fn persist_failure_after_anchor_is_an_inconsistency() {
        let store = Arc::new(FailingCreateStore(MemoryStore::new()));
        let audit = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MockLedgerClient::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let coordinator =
            SubmissionCoordinator::new(store, audit, ledger.clone(), blobs.clone());

        let err = coordinator.submit(request(b"report-v1")).await.unwrap_err();
        match err {
            PipelineError::Inconsistency {
                ledger_id,
                fingerprint,
                ..
            } => {
                assert_eq!(ledger_id, 1);
                assert_eq!(fingerprint, Fingerprint::of(b"report-v1").to_hex());
            }
            other => panic!("expected inconsistency, got {other:?}"),
        }

        // The anchor exists and the blob is retained for manual
        // reconciliation.
        assert_eq!(ledger.record_count(), 1);
        assert_eq!(blobs.len().await, 1);
    }
}
