//! Grading
//!
//! Grading is a one-time transition: `anchored`/`submitted` -> `graded`.
//! The ledger is graded first, the local store second, so a crash between
//! the two leaves the ledger as the authoritative record; local state can be
//! repaired by replay, the reverse cannot.

use std::sync::Arc;

use chrono::Utc;
use docket_core::{actions, ActorId, AuditEntry, GradeRecord, Submission, SubmissionId,
    SubmissionStatus};
use docket_ledger::LedgerClient;
use docket_store::{AuditTrail, SubmissionStore};
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};

/// Applies grades, ledger first
pub struct GradingService {
    store: Arc<dyn SubmissionStore>,
    audit: Arc<dyn AuditTrail>,
    ledger: Arc<dyn LedgerClient>,
}

impl GradingService {
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

    /// Grade a submission once
    pub async fn grade(
        &self,
        id: &SubmissionId,
        grade: u8,
        feedback: Option<String>,
        grader_id: &ActorId,
    ) -> PipelineResult<Submission> {
        if grade > 100 {
            return Err(PipelineError::Validation(format!(
                "grade must be in 0..=100, got {grade}"
            )));
        }

        // Fail fast on the local record before any ledger spend. Two
        // concurrent graders can both pass this check; the guarded store
        // update below resolves that race, the loser receiving
        // AlreadyGraded after a redundant ledger call.
        let submission = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("submission {id}")))?;
        if submission.is_graded() {
            return Err(PipelineError::AlreadyGraded(format!("submission {id}")));
        }
        if !submission.status.can_transition_to(SubmissionStatus::Graded) {
            return Err(PipelineError::Validation(format!(
                "cannot grade a submission in status {}",
                submission.status
            )));
        }

        self.ledger
            .grade(submission.ledger_id, grade, feedback.as_deref().unwrap_or(""))
            .await?;

        let record = GradeRecord {
            grade,
            feedback,
            grader_id: grader_id.clone(),
            graded_at: Utc::now(),
        };
        let updated = self.store.apply_grade(id, &record).await?;

        let entry = AuditEntry::new(
            grader_id.0.clone(),
            actions::SUBMISSION_GRADED,
            format!("{} graded: {}", updated.title, grade),
        );
        if let Err(e) = self.audit.append(&entry).await {
            warn!(error = %e, "Failed to append audit entry");
        }

        info!(
            submission_id = %id,
            ledger_id = %updated.ledger_id,
            grade,
            "Submission graded"
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{SubmissionCoordinator, SubmitRequest};
    use docket_ledger::MockLedgerClient;
    use docket_store::{MemoryBlobStore, MemoryStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        ledger: Arc<MockLedgerClient>,
        coordinator: SubmissionCoordinator,
        grading: GradingService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MockLedgerClient::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let coordinator =
            SubmissionCoordinator::new(store.clone(), store.clone(), ledger.clone(), blobs);
        let grading = GradingService::new(store.clone(), store.clone(), ledger.clone());
        Fixture {
            store,
            ledger,
            coordinator,
            grading,
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
    async fn grade_applies_once() {
        let f = fixture();
        let submission = f.coordinator.submit(request(b"report-v1")).await.unwrap();

        let graded = f
            .grading
            .grade(
                &submission.id,
                87,
                Some("Solid work".to_string()),
                &ActorId::new("lecturer-1"),
            )
            .await
            .unwrap();
        assert_eq!(graded.status, SubmissionStatus::Graded);
        assert_eq!(graded.grade.as_ref().unwrap().grade, 87);

        let err = f
            .grading
            .grade(&submission.id, 40, None, &ActorId::new("lecturer-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyGraded(_)));

        // The first grade survives the second attempt.
        let loaded = f.store.get(&submission.id).await.unwrap().unwrap();
        let grade = loaded.grade.unwrap();
        assert_eq!(grade.grade, 87);
        assert_eq!(grade.feedback.as_deref(), Some("Solid work"));
        assert_eq!(grade.grader_id.0, "lecturer-1");
    }

    #[tokio::test]
    async fn out_of_range_grade_is_rejected() {
        let f = fixture();
        let submission = f.coordinator.submit(request(b"report-v1")).await.unwrap();

        let err = f
            .grading
            .grade(&submission.id, 101, None, &ActorId::new("lecturer-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn grading_unknown_submission_is_not_found() {
        let f = fixture();
        let err = f
            .grading
            .grade(&SubmissionId::generate(), 50, None, &ActorId::new("lecturer-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn ledger_grade_failure_leaves_local_record_ungraded() {
        let f = fixture();
        let submission = f.coordinator.submit(request(b"report-v1")).await.unwrap();

        f.ledger.set_fail_reads(true);
        let err = f
            .grading
            .grade(&submission.id, 70, None, &ActorId::new("lecturer-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Ledger(_)));

        // Ledger-first ordering: the local record stays ungraded.
        let loaded = f.store.get(&submission.id).await.unwrap().unwrap();
        assert!(loaded.grade.is_none());
        assert_eq!(loaded.status, SubmissionStatus::Anchored);
    }
}
