//! In-memory Local Record Store
//!
//! Satisfies the same interface as the durable store; the uniqueness check
//! and the insert happen under a single write lock, so the create contract
//! (exactly one winner for identical content) holds here too.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use docket_core::{
    AuditEntry, Fingerprint, GradeRecord, LedgerRecordId, Submission, SubmissionId,
    SubmissionStatus, VerificationAttempt,
};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::{AuditTrail, SubmissionFilter, SubmissionStore};

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, Submission>,
    by_fingerprint: HashMap<String, String>,
    by_ledger_id: HashMap<u64, String>,
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    audit: RwLock<Vec<AuditEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create(&self, submission: &Submission) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let fp = submission.fingerprint.to_hex();
        if inner.by_fingerprint.contains_key(&fp) {
            return Err(StoreError::Conflict(format!(
                "fingerprint {fp} already exists"
            )));
        }
        if inner.by_ledger_id.contains_key(&submission.ledger_id.0) {
            return Err(StoreError::Conflict(format!(
                "ledger id {} already exists",
                submission.ledger_id
            )));
        }
        inner.by_fingerprint.insert(fp, submission.id.0.clone());
        inner
            .by_ledger_id
            .insert(submission.ledger_id.0, submission.id.0.clone());
        inner
            .by_id
            .insert(submission.id.0.clone(), submission.clone());
        Ok(())
    }

    async fn get(&self, id: &SubmissionId) -> StoreResult<Option<Submission>> {
        Ok(self.inner.read().await.by_id.get(&id.0).cloned())
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> StoreResult<Option<Submission>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_fingerprint
            .get(&fingerprint.to_hex())
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_ledger_id(
        &self,
        ledger_id: LedgerRecordId,
    ) -> StoreResult<Option<Submission>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_ledger_id
            .get(&ledger_id.0)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn list(&self, filter: SubmissionFilter) -> StoreResult<Vec<Submission>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Submission> = inner
            .by_id
            .values()
            .filter(|s| {
                filter.owner.as_ref().map_or(true, |o| &s.owner_id == o)
                    && filter.status.map_or(true, |st| s.status == st)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn append_verification_attempt(
        &self,
        id: &SubmissionId,
        attempt: &VerificationAttempt,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let submission = inner
            .by_id
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::NotFound(format!("submission {}", id.0)))?;
        submission.verification_history.push(attempt.clone());
        submission.updated_at = Utc::now();
        Ok(())
    }

    async fn apply_grade(
        &self,
        id: &SubmissionId,
        grade: &GradeRecord,
    ) -> StoreResult<Submission> {
        let mut inner = self.inner.write().await;
        let submission = inner
            .by_id
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::NotFound(format!("submission {}", id.0)))?;
        if submission.grade.is_some() {
            return Err(StoreError::AlreadyGraded(format!("submission {}", id.0)));
        }
        submission.grade = Some(grade.clone());
        submission.status = SubmissionStatus::Graded;
        submission.updated_at = Utc::now();
        Ok(submission.clone())
    }
}

#[async_trait]
impl AuditTrail for MemoryStore {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        self.audit.write().await.push(entry.clone());
        Ok(())
    }

    async fn entries(&self, limit: u32, offset: u32) -> StoreResult<Vec<AuditEntry>> {
        let audit = self.audit.read().await;
        Ok(audit
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::{ActorId, VerificationOutcome};

    fn sample(content: &[u8], ledger_id: u64) -> Submission {
        let now = Utc::now();
        Submission {
            id: SubmissionId::generate(),
            fingerprint: Fingerprint::of(content),
            ledger_id: LedgerRecordId(ledger_id),
            ledger_tx_ref: format!("tx:{ledger_id}"),
            ledger_block_ref: None,
            ledger_cost: 100,
            owner_id: ActorId::new("owner-1"),
            owner_name: "Owner One".to_string(),
            title: "Essay".to_string(),
            original_name: "essay.txt".to_string(),
            size: content.len() as u64,
            mime_type: "text/plain".to_string(),
            blob_locator: format!("blob-{ledger_id}"),
            status: SubmissionStatus::Anchored,
            grade: None,
            verification_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_fingerprint() {
        let store = MemoryStore::new();
        store.create(&sample(b"same", 1)).await.unwrap();
        let err = store.create(&sample(b"same", 2)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn attempts_accumulate() {
        let store = MemoryStore::new();
        let submission = sample(b"content", 1);
        store.create(&submission).await.unwrap();

        let attempt = VerificationAttempt {
            verifier_id: ActorId::new("verifier-1"),
            attempted_at: Utc::now(),
            outcome: VerificationOutcome::Failed,
            ledger_fingerprint: Fingerprint::of(b"other"),
            local_fingerprint: submission.fingerprint,
        };
        store
            .append_verification_attempt(&submission.id, &attempt)
            .await
            .unwrap();
        store
            .append_verification_attempt(&submission.id, &attempt)
            .await
            .unwrap();

        let loaded = store.get(&submission.id).await.unwrap().unwrap();
        assert_eq!(loaded.verification_history.len(), 2);
    }

    #[tokio::test]
    async fn grade_is_one_time() {
        let store = MemoryStore::new();
        let submission = sample(b"content", 1);
        store.create(&submission).await.unwrap();

        let grade = GradeRecord {
            grade: 92,
            feedback: None,
            grader_id: ActorId::new("lecturer-1"),
            graded_at: Utc::now(),
        };
        store.apply_grade(&submission.id, &grade).await.unwrap();
        let err = store.apply_grade(&submission.id, &grade).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyGraded(_)));
    }
}
