//! HTTP ledger client
//!
//! Talks to a remote ledger API over request/response HTTP. Every call
//! carries an explicit timeout; a timeout surfaces as its own error variant
//! because the caller cannot know whether a timed-out submit anchored.
//!
//! Retry with exponential backoff wraps the read-only operations only.
//! `submit` and `grade` are single-shot: both are irreversible on the ledger
//! side, and whether to re-issue them is the caller's decision.

use async_trait::async_trait;
use docket_core::{Fingerprint, LedgerRecordId};
use serde::Deserialize;

use crate::client::{AnchorReceipt, AnchorRequest, LedgerClient, LedgerRecord};
use crate::error::{LedgerError, LedgerResult};

/// Retry configuration for read-only ledger calls
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retries
    pub max_retries: u32,
    /// Initial backoff in milliseconds
    pub initial_backoff_ms: u64,
    /// Maximum backoff in milliseconds
    pub max_backoff_ms: u64,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 5000,
            multiplier: 2.0,
        }
    }
}

/// HTTP-based ledger client
pub struct HttpLedgerClient {
    /// Base URL for the ledger API
    base_url: String,
    client: reqwest::Client,
    timeout: std::time::Duration,
    retry_config: RetryConfig,
}

impl HttpLedgerClient {
    /// Create a client with default timeout and retry settings
    pub fn new(base_url: &str) -> Self {
        Self::with_config(base_url, 30, RetryConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(base_url: &str, timeout_secs: u64, retry_config: RetryConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            timeout: std::time::Duration::from_secs(timeout_secs),
            retry_config,
        }
    }

    /// Execute a read-only request with retry
    async fn execute_with_retry<T, F, Fut>(&self, operation: F) -> LedgerResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = LedgerResult<T>>,
    {
        let mut last_error = LedgerError::Unavailable("No attempts made".to_string());
        let mut backoff_ms = self.retry_config.initial_backoff_ms;

        for attempt in 0..=self.retry_config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = e;
                    if attempt < self.retry_config.max_retries {
                        tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
                        backoff_ms = std::cmp::min(
                            (backoff_ms as f64 * self.retry_config.multiplier) as u64,
                            self.retry_config.max_backoff_ms,
                        );
                    }
                }
            }
        }

        Err(last_error)
    }
}

fn transport_error(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::Timeout(e.to_string())
    } else {
        LedgerError::Unavailable(format!("HTTP request failed: {e}"))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn submit(&self, request: &AnchorRequest) -> LedgerResult<AnchorReceipt> {
        let url = format!("{}/api/v1/records", self.base_url);

        let body = serde_json::json!({
            "owner_name": request.owner_name,
            "title": request.title,
            "original_name": request.original_name,
            "fingerprint": request.fingerprint.to_hex(),
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LedgerError::Rejected(format!(
                "submit failed with status {status}: {error_text}"
            )));
        }

        #[derive(Deserialize)]
        struct SubmitResponse {
            record_id: u64,
            tx_ref: String,
            block_ref: Option<String>,
            cost: u64,
        }

        let result: SubmitResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("parse submit response: {e}")))?;

        Ok(AnchorReceipt {
            ledger_id: LedgerRecordId(result.record_id),
            tx_ref: result.tx_ref,
            block_ref: result.block_ref,
            cost: result.cost,
        })
    }

    async fn check_duplicate(&self, fingerprint: &Fingerprint) -> LedgerResult<bool> {
        let url = format!(
            "{}/api/v1/records/duplicate/{}",
            self.base_url,
            fingerprint.to_hex()
        );

        self.execute_with_retry(|| async {
            let response = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(transport_error)?;

            if !response.status().is_success() {
                return Err(LedgerError::Unavailable(format!(
                    "duplicate check failed: status {}",
                    response.status()
                )));
            }

            #[derive(Deserialize)]
            struct DuplicateResponse {
                duplicate: bool,
            }

            let result: DuplicateResponse = response.json().await.map_err(|e| {
                LedgerError::InvalidResponse(format!("parse duplicate response: {e}"))
            })?;

            Ok(result.duplicate)
        })
        .await
    }

    async fn read_record(&self, ledger_id: LedgerRecordId) -> LedgerResult<Option<LedgerRecord>> {
        let url = format!("{}/api/v1/records/{}", self.base_url, ledger_id.0);

        self.execute_with_retry(|| async {
            let response = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(transport_error)?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }

            if !response.status().is_success() {
                return Err(LedgerError::Unavailable(format!(
                    "read record failed: status {}",
                    response.status()
                )));
            }

            #[derive(Deserialize)]
            struct RecordResponse {
                fingerprint: String,
                owner_ref: String,
                recorded_at: chrono::DateTime<chrono::Utc>,
            }

            let result: RecordResponse = response
                .json()
                .await
                .map_err(|e| LedgerError::InvalidResponse(format!("parse record: {e}")))?;

            let fingerprint = Fingerprint::from_hex(&result.fingerprint).map_err(|e| {
                LedgerError::InvalidResponse(format!("record fingerprint: {e}"))
            })?;

            Ok(Some(LedgerRecord {
                fingerprint,
                owner_ref: result.owner_ref,
                recorded_at: result.recorded_at,
            }))
        })
        .await
    }

    async fn grade(
        &self,
        ledger_id: LedgerRecordId,
        grade: u8,
        feedback: &str,
    ) -> LedgerResult<()> {
        let url = format!("{}/api/v1/records/{}/grade", self.base_url, ledger_id.0);

        let body = serde_json::json!({
            "grade": grade,
            "feedback": feedback,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LedgerError::Rejected(format!(
                "grade failed with status {status}: {error_text}"
            )));
        }

        Ok(())
    }
}
