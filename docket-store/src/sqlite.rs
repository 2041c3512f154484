//! SQLite-backed Local Record Store
//!
//! Durable implementation of [`SubmissionStore`] and [`AuditTrail`].
//! The fingerprint and ledger-id uniqueness invariants live in UNIQUE
//! constraints, so concurrent inserts of the same content resolve inside
//! SQLite: exactly one wins, the other surfaces as `Conflict`.
//!
//! Verification attempts are rows in their own table; appending one never
//! rewrites the submission record, so concurrent verifiers cannot lose each
//! other's entries.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docket_core::{
    ActorId, AuditEntry, Fingerprint, GradeRecord, LedgerRecordId, Submission, SubmissionId,
    SubmissionStatus, VerificationAttempt, VerificationOutcome,
};
use rusqlite::{params, OptionalExtension, Row, ToSql};
use tokio_rusqlite::Connection;

use crate::error::{StoreError, StoreResult};
use crate::store::{AuditTrail, SubmissionFilter, SubmissionStore};

/// Open options for the SQLite store
#[derive(Debug, Clone)]
pub struct SqliteStoreOptions {
    pub path: PathBuf,
}

impl SqliteStoreOptions {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

const SUBMISSION_COLUMNS: &str = "id, fingerprint, ledger_id, ledger_tx_ref, ledger_block_ref, \
     ledger_cost, owner_id, owner_name, title, original_name, size, mime_type, blob_locator, \
     status, grade, feedback, grader_id, graded_at, created_at, updated_at";

impl SqliteStore {
    /// Open (and initialize) the store at the configured path
    pub async fn open(opts: SqliteStoreOptions) -> StoreResult<Self> {
        if let Some(parent) = opts.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("create store dir {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(&opts.path).await.map_err(map_db_err)?;
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS submissions (
                  id              TEXT PRIMARY KEY,
                  fingerprint     TEXT NOT NULL UNIQUE,
                  ledger_id       INTEGER NOT NULL UNIQUE,
                  ledger_tx_ref   TEXT NOT NULL,
                  ledger_block_ref TEXT,
                  ledger_cost     INTEGER NOT NULL,
                  owner_id        TEXT NOT NULL,
                  owner_name      TEXT NOT NULL,
                  title           TEXT NOT NULL,
                  original_name   TEXT NOT NULL,
                  size            INTEGER NOT NULL,
                  mime_type       TEXT NOT NULL,
                  blob_locator    TEXT NOT NULL,
                  status          TEXT NOT NULL,
                  grade           INTEGER,
                  feedback        TEXT,
                  grader_id       TEXT,
                  graded_at       TEXT,
                  created_at      TEXT NOT NULL,
                  updated_at      TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS submissions_owner_idx
                  ON submissions(owner_id, created_at DESC);
                CREATE INDEX IF NOT EXISTS submissions_status_idx
                  ON submissions(status);

                CREATE TABLE IF NOT EXISTS verification_attempts (
                  id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                  submission_id      TEXT NOT NULL REFERENCES submissions(id),
                  verifier_id        TEXT NOT NULL,
                  attempted_at       TEXT NOT NULL,
                  outcome            TEXT NOT NULL,
                  ledger_fingerprint TEXT NOT NULL,
                  local_fingerprint  TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS attempts_submission_idx
                  ON verification_attempts(submission_id);

                CREATE TABLE IF NOT EXISTS audit_log (
                  id        INTEGER PRIMARY KEY AUTOINCREMENT,
                  actor     TEXT NOT NULL,
                  action    TEXT NOT NULL,
                  detail    TEXT NOT NULL,
                  timestamp TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS audit_ts_idx ON audit_log(timestamp);
                "#,
            )?;
            Ok(())
        })
        .await
        .map_err(map_db_err)?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl SubmissionStore for SqliteStore {
    async fn create(&self, submission: &Submission) -> StoreResult<()> {
        let s = submission.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO submissions (id, fingerprint, ledger_id, ledger_tx_ref, \
                     ledger_block_ref, ledger_cost, owner_id, owner_name, title, original_name, \
                     size, mime_type, blob_locator, status, grade, feedback, grader_id, \
                     graded_at, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
                     ?16, ?17, ?18, ?19, ?20)",
                    params![
                        s.id.0,
                        s.fingerprint.to_hex(),
                        s.ledger_id.0 as i64,
                        s.ledger_tx_ref,
                        s.ledger_block_ref,
                        s.ledger_cost as i64,
                        s.owner_id.0,
                        s.owner_name,
                        s.title,
                        s.original_name,
                        s.size as i64,
                        s.mime_type,
                        s.blob_locator,
                        s.status.as_str(),
                        s.grade.as_ref().map(|g| g.grade as i64),
                        s.grade.as_ref().and_then(|g| g.feedback.clone()),
                        s.grade.as_ref().map(|g| g.grader_id.0.clone()),
                        s.grade.as_ref().map(|g| g.graded_at.to_rfc3339()),
                        s.created_at.to_rfc3339(),
                        s.updated_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_db_err)
    }

    async fn get(&self, id: &SubmissionId) -> StoreResult<Option<Submission>> {
        self.query_one("id = ?1", vec![Box::new(id.0.clone())]).await
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> StoreResult<Option<Submission>> {
        self.query_one("fingerprint = ?1", vec![Box::new(fingerprint.to_hex())])
            .await
    }

    async fn find_by_ledger_id(
        &self,
        ledger_id: LedgerRecordId,
    ) -> StoreResult<Option<Submission>> {
        self.query_one("ledger_id = ?1", vec![Box::new(ledger_id.0 as i64)])
            .await
    }

    async fn list(&self, filter: SubmissionFilter) -> StoreResult<Vec<Submission>> {
        self.conn
            .call(move |conn| {
                let mut clauses: Vec<&str> = Vec::new();
                let mut args: Vec<Box<dyn ToSql + Send>> = Vec::new();

                if let Some(owner) = &filter.owner {
                    args.push(Box::new(owner.0.clone()));
                    clauses.push("owner_id = ?");
                }
                if let Some(status) = filter.status {
                    args.push(Box::new(status.as_str().to_string()));
                    clauses.push("status = ?");
                }
                args.push(Box::new(filter.limit as i64));
                args.push(Box::new(filter.offset as i64));

                let where_sql = if clauses.is_empty() {
                    String::new()
                } else {
                    format!("WHERE {} ", clauses.join(" AND "))
                };
                let sql = format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions {where_sql}\
                     ORDER BY created_at DESC LIMIT ? OFFSET ?"
                );

                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    rusqlite::params_from_iter(args.iter().map(|a| a.as_ref() as &dyn ToSql)),
                    row_to_submission,
                )?;
                let mut submissions = rows.collect::<Result<Vec<_>, _>>()?;
                for submission in &mut submissions {
                    submission.verification_history = load_attempts(conn, &submission.id.0)?;
                }
                Ok(submissions)
            })
            .await
            .map_err(map_db_err)
    }

    async fn append_verification_attempt(
        &self,
        id: &SubmissionId,
        attempt: &VerificationAttempt,
    ) -> StoreResult<()> {
        let id_str = id.0.clone();
        let attempt = attempt.clone();
        let found = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let exists: Option<i64> = tx
                    .query_row(
                        "SELECT 1 FROM submissions WHERE id = ?1",
                        params![id_str],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_none() {
                    return Ok(false);
                }
                tx.execute(
                    "INSERT INTO verification_attempts (submission_id, verifier_id, \
                     attempted_at, outcome, ledger_fingerprint, local_fingerprint) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        id_str,
                        attempt.verifier_id.0,
                        attempt.attempted_at.to_rfc3339(),
                        attempt.outcome.as_str(),
                        attempt.ledger_fingerprint.to_hex(),
                        attempt.local_fingerprint.to_hex(),
                    ],
                )?;
                tx.execute(
                    "UPDATE submissions SET updated_at = ?1 WHERE id = ?2",
                    params![Utc::now().to_rfc3339(), id_str],
                )?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(map_db_err)?;

        if !found {
            return Err(StoreError::NotFound(format!("submission {}", id.0)));
        }
        Ok(())
    }

    async fn apply_grade(
        &self,
        id: &SubmissionId,
        grade: &GradeRecord,
    ) -> StoreResult<Submission> {
        let id_str = id.0.clone();
        let grade = grade.clone();
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                // The `grade IS NULL` guard makes the one-time transition
                // atomic under concurrent graders.
                let changed = tx.execute(
                    "UPDATE submissions SET grade = ?1, feedback = ?2, grader_id = ?3, \
                     graded_at = ?4, status = 'graded', updated_at = ?5 \
                     WHERE id = ?6 AND grade IS NULL",
                    params![
                        grade.grade as i64,
                        grade.feedback,
                        grade.grader_id.0,
                        grade.graded_at.to_rfc3339(),
                        Utc::now().to_rfc3339(),
                        id_str,
                    ],
                )?;

                if changed == 1 {
                    let mut submission = tx.query_row(
                        &format!(
                            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?1"
                        ),
                        params![id_str],
                        row_to_submission,
                    )?;
                    submission.verification_history = load_attempts(&tx, &submission.id.0)?;
                    tx.commit()?;
                    return Ok(GradeApply::Applied(submission));
                }

                let graded: Option<bool> = tx
                    .query_row(
                        "SELECT grade IS NOT NULL FROM submissions WHERE id = ?1",
                        params![id_str],
                        |row| row.get(0),
                    )
                    .optional()?;
                tx.commit()?;
                match graded {
                    Some(true) => Ok(GradeApply::AlreadyGraded),
                    Some(false) => Ok(GradeApply::Missing),
                    None => Ok(GradeApply::Missing),
                }
            })
            .await
            .map_err(map_db_err)?;

        match outcome {
            GradeApply::Applied(submission) => Ok(submission),
            GradeApply::AlreadyGraded => {
                Err(StoreError::AlreadyGraded(format!("submission {}", id.0)))
            }
            GradeApply::Missing => Err(StoreError::NotFound(format!("submission {}", id.0))),
        }
    }
}

#[async_trait]
impl AuditTrail for SqliteStore {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO audit_log (actor, action, detail, timestamp) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        entry.actor,
                        entry.action,
                        entry.detail,
                        entry.timestamp.to_rfc3339()
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_db_err)
    }

    async fn entries(&self, limit: u32, offset: u32) -> StoreResult<Vec<AuditEntry>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT actor, action, detail, timestamp FROM audit_log \
                     ORDER BY id DESC LIMIT ?1 OFFSET ?2",
                )?;
                let rows = stmt.query_map(params![limit as i64, offset as i64], |row| {
                    Ok(AuditEntry {
                        actor: row.get(0)?,
                        action: row.get(1)?,
                        detail: row.get(2)?,
                        timestamp: parse_dt(3, row.get::<_, String>(3)?)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(map_db_err)
    }
}

enum GradeApply {
    Applied(Submission),
    AlreadyGraded,
    Missing,
}

impl SqliteStore {
    async fn query_one(
        &self,
        clause: &str,
        args: Vec<Box<dyn ToSql + Send>>,
    ) -> StoreResult<Option<Submission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE {clause}");
        self.conn
            .call(move |conn| {
                let submission = conn
                    .query_row(
                        &sql,
                        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref() as &dyn ToSql)),
                        row_to_submission,
                    )
                    .optional()?;
                match submission {
                    Some(mut s) => {
                        s.verification_history = load_attempts(conn, &s.id.0)?;
                        Ok(Some(s))
                    }
                    None => Ok(None),
                }
            })
            .await
            .map_err(map_db_err)
    }
}

fn load_attempts(
    conn: &rusqlite::Connection,
    submission_id: &str,
) -> rusqlite::Result<Vec<VerificationAttempt>> {
    let mut stmt = conn.prepare(
        "SELECT verifier_id, attempted_at, outcome, ledger_fingerprint, local_fingerprint \
         FROM verification_attempts WHERE submission_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![submission_id], |row| {
        Ok(VerificationAttempt {
            verifier_id: ActorId(row.get(0)?),
            attempted_at: parse_dt(1, row.get::<_, String>(1)?)?,
            outcome: parse_outcome(2, row.get::<_, String>(2)?)?,
            ledger_fingerprint: parse_fp(3, row.get::<_, String>(3)?)?,
            local_fingerprint: parse_fp(4, row.get::<_, String>(4)?)?,
        })
    })?;
    rows.collect()
}

fn row_to_submission(row: &Row<'_>) -> rusqlite::Result<Submission> {
    let grade: Option<i64> = row.get(14)?;
    let grade = match grade {
        Some(value) => {
            let grader_id: Option<String> = row.get(16)?;
            let graded_at: Option<String> = row.get(17)?;
            match (grader_id, graded_at) {
                (Some(grader_id), Some(graded_at)) => Some(GradeRecord {
                    grade: value as u8,
                    feedback: row.get(15)?,
                    grader_id: ActorId(grader_id),
                    graded_at: parse_dt(17, graded_at)?,
                }),
                _ => {
                    return Err(rusqlite::Error::IntegralValueOutOfRange(16, value));
                }
            }
        }
        None => None,
    };

    Ok(Submission {
        id: SubmissionId(row.get(0)?),
        fingerprint: parse_fp(1, row.get::<_, String>(1)?)?,
        ledger_id: LedgerRecordId(row.get::<_, i64>(2)? as u64),
        ledger_tx_ref: row.get(3)?,
        ledger_block_ref: row.get(4)?,
        ledger_cost: row.get::<_, i64>(5)? as u64,
        owner_id: ActorId(row.get(6)?),
        owner_name: row.get(7)?,
        title: row.get(8)?,
        original_name: row.get(9)?,
        size: row.get::<_, i64>(10)? as u64,
        mime_type: row.get(11)?,
        blob_locator: row.get(12)?,
        status: parse_status(13, row.get::<_, String>(13)?)?,
        grade,
        verification_history: Vec::new(),
        created_at: parse_dt(18, row.get::<_, String>(18)?)?,
        updated_at: parse_dt(19, row.get::<_, String>(19)?)?,
    })
}

fn parse_dt(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    value.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_fp(idx: usize, value: String) -> rusqlite::Result<Fingerprint> {
    Fingerprint::from_hex(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_status(idx: usize, value: String) -> rusqlite::Result<SubmissionStatus> {
    SubmissionStatus::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown status: {value}").into(),
        )
    })
}

fn parse_outcome(idx: usize, value: String) -> rusqlite::Result<VerificationOutcome> {
    VerificationOutcome::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown outcome: {value}").into(),
        )
    })
}

fn map_db_err(e: tokio_rusqlite::Error) -> StoreError {
    match e {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(err, msg))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(msg.unwrap_or_else(|| "unique constraint violated".to_string()))
        }
        other => StoreError::Storage(other.to_string()),
    }
}
