//! Verification Reconciler
//!
//! Compares a submission's stored fingerprint against the fingerprint the
//! ledger holds for the same record, byte for byte. Every attempt lands in
//! the submission's history with both fingerprints recorded, success
//! included, to keep a full forensic trail.
//!
//! A failed verification never moves `status`: the mismatch might stem from
//! a ledger read error rather than real tampering, so it is a signal for
//! human review, not an automatic state transition.

use std::sync::Arc;

use chrono::Utc;
use docket_core::{
    actions, ActorId, AuditEntry, SubmissionId, VerificationAttempt, VerificationOutcome,
};
use docket_ledger::LedgerClient;
use docket_store::{AuditTrail, SubmissionStore};
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};

/// Reconciles local records against the ledger
pub struct VerificationReconciler {
    store: Arc<dyn SubmissionStore>,
    audit: Arc<dyn AuditTrail>,
    ledger: Arc<dyn LedgerClient>,
}

impl VerificationReconciler {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        audit: Arc<dyn AuditTrail>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            store,
            audit,
            ledger,
        }
    }

    /// Verify one submission and append the verdict to its history
    pub async fn verify(
        &self,
        id: &SubmissionId,
        verifier_id: &ActorId,
    ) -> PipelineResult<VerificationAttempt> {
        let submission = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("submission {id}")))?;

        // A missing record is a tamper signal in its own right: the ledger
        // is append-only, so an anchored record cannot legitimately vanish.
        // Transport failures propagate separately.
        let record = self
            .ledger
            .read_record(submission.ledger_id)
            .await?
            .ok_or(PipelineError::LedgerRecordMissing {
                submission_id: submission.id.0.clone(),
                ledger_id: submission.ledger_id.0,
            })?;

        let outcome = if record.fingerprint == submission.fingerprint {
            VerificationOutcome::Success
        } else {
            VerificationOutcome::Failed
        };

        let attempt = VerificationAttempt {
            verifier_id: verifier_id.clone(),
            attempted_at: Utc::now(),
            outcome,
            ledger_fingerprint: record.fingerprint,
            local_fingerprint: submission.fingerprint,
        };

        self.store.append_verification_attempt(id, &attempt).await?;

        let (action, detail) = match outcome {
            VerificationOutcome::Success => (
                actions::VERIFICATION_SUCCESS,
                format!("{} verified against ledger record {}", submission.title, submission.ledger_id),
            ),
            VerificationOutcome::Failed => (
                actions::VERIFICATION_FAILED,
                format!(
                    "{} fingerprint mismatch: ledger {} vs local {}",
                    submission.title, record.fingerprint, submission.fingerprint
                ),
            ),
        };
        let entry = AuditEntry::new(verifier_id.0.clone(), action, detail);
        if let Err(e) = self.audit.append(&entry).await {
            warn!(error = %e, "Failed to append audit entry");
        }

        match outcome {
            VerificationOutcome::Success => info!(
                submission_id = %id,
                ledger_id = %submission.ledger_id,
                "Verification succeeded"
            ),
            VerificationOutcome::Failed => warn!(
                submission_id = %id,
                ledger_id = %submission.ledger_id,
                ledger_fingerprint = %attempt.ledger_fingerprint,
                local_fingerprint = %attempt.local_fingerprint,
                "Verification failed: fingerprints diverge"
            ),
        }

        Ok(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{SubmissionCoordinator, SubmitRequest};
    use docket_core::{Fingerprint, SubmissionStatus};
    use docket_ledger::MockLedgerClient;
    use docket_store::{MemoryBlobStore, MemoryStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        ledger: Arc<MockLedgerClient>,
        coordinator: SubmissionCoordinator,
        reconciler: VerificationReconciler,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MockLedgerClient::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let coordinator =
            SubmissionCoordinator::new(store.clone(), store.clone(), ledger.clone(), blobs);
        let reconciler =
            VerificationReconciler::new(store.clone(), store.clone(), ledger.clone());
        Fixture {
            store,
            ledger,
            coordinator,
            reconciler,
        }
    }

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

    #[tokio::test]
    async fn matching_fingerprints_verify_successfully() {
        let f = fixture();
        let submission = f.coordinator.submit(request(b"report-v1")).await.unwrap();

        let attempt = f
            .reconciler
            .verify(&submission.id, &ActorId::new("lecturer-1"))
            .await
            .unwrap();

        assert_eq!(attempt.outcome, VerificationOutcome::Success);
        assert_eq!(attempt.ledger_fingerprint, attempt.local_fingerprint);

        let loaded = f.store.get(&submission.id).await.unwrap().unwrap();
        assert_eq!(loaded.verification_history.len(), 1);
        // Success never mutates status.
        assert_eq!(loaded.status, SubmissionStatus::Anchored);
    }

    #[tokio::test]
    async fn tampered_ledger_record_fails_verification() {
        let f = fixture();
        let submission = f.coordinator.submit(request(b"report-v1")).await.unwrap();

        f.ledger
            .tamper_record(submission.ledger_id, Fingerprint::of(b"tampered"));

        let attempt = f
            .reconciler
            .verify(&submission.id, &ActorId::new("lecturer-1"))
            .await
            .unwrap();

        assert_eq!(attempt.outcome, VerificationOutcome::Failed);
        assert_eq!(attempt.ledger_fingerprint, Fingerprint::of(b"tampered"));
        assert_eq!(attempt.local_fingerprint, Fingerprint::of(b"report-v1"));

        let loaded = f.store.get(&submission.id).await.unwrap().unwrap();
        assert_eq!(loaded.verification_history.len(), 1);
        // A failed verification is a signal, not a transition.
        assert_eq!(loaded.status, SubmissionStatus::Anchored);
    }

    #[tokio::test]
    async fn missing_ledger_record_is_surfaced_distinctly() {
        let f = fixture();
        let submission = f.coordinator.submit(request(b"report-v1")).await.unwrap();

        f.ledger.remove_record(submission.ledger_id);

        let err = f
            .reconciler
            .verify(&submission.id, &ActorId::new("lecturer-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::LedgerRecordMissing { .. }));

        // No attempt is appended for a read that produced no verdict.
        let loaded = f.store.get(&submission.id).await.unwrap().unwrap();
        assert!(loaded.verification_history.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_propagates_as_ledger_error() {
        let f = fixture();
        let submission = f.coordinator.submit(request(b"report-v1")).await.unwrap();

        f.ledger.set_fail_reads(true);
        let err = f
            .reconciler
            .verify(&submission.id, &ActorId::new("lecturer-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Ledger(_)));
    }

    #[tokio::test]
    async fn unknown_submission_is_not_found() {
        let f = fixture();
        let err = f
            .reconciler
            .verify(&SubmissionId::generate(), &ActorId::new("lecturer-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_verifiers_both_land_in_history() {
        let f = fixture();
        let submission = f.coordinator.submit(request(b"report-v1")).await.unwrap();

        let reconciler = Arc::new(f.reconciler);
        let r1 = Arc::clone(&reconciler);
        let r2 = Arc::clone(&reconciler);
        let id1 = submission.id.clone();
        let id2 = submission.id.clone();

        let (a, b) = tokio::join!(
            async move { r1.verify(&id1, &ActorId::new("lecturer-1")).await },
            async move { r2.verify(&id2, &ActorId::new("lecturer-2")).await },
        );
        a.unwrap();
        b.unwrap();

        let loaded = f.store.get(&submission.id).await.unwrap().unwrap();
        assert_eq!(loaded.verification_history.len(), 2);
    }
}
