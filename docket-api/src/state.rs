//! Application state for the API server

use std::sync::Arc;

use docket_ledger::LedgerClient;
use docket_pipeline::{GradingService, SubmissionCoordinator, VerificationReconciler};
use docket_store::{AuditTrail, BlobStore, SubmissionStore};

/// API server state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SubmissionCoordinator>,
    pub reconciler: Arc<VerificationReconciler>,
    pub grading: Arc<GradingService>,
    pub store: Arc<dyn SubmissionStore>,
    pub audit: Arc<dyn AuditTrail>,
    pub blobs: Arc<dyn BlobStore>,
    /// API version
    pub version: String,
}

impl AppState {
    /// Assemble the pipeline over the chosen store, ledger and blob store
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        audit: Arc<dyn AuditTrail>,
        blobs: Arc<dyn BlobStore>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        let coordinator = Arc::new(SubmissionCoordinator::new(
            store.clone(),
            audit.clone(),
            ledger.clone(),
            blobs.clone(),
        ));
        let reconciler = Arc::new(VerificationReconciler::new(
            store.clone(),
            audit.clone(),
            ledger.clone(),
        ));
        let grading = Arc::new(GradingService::new(
            store.clone(),
            audit.clone(),
            ledger,
        ));

        Self {
            coordinator,
            reconciler,
            grading,
            store,
            audit,
            blobs,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Upload size cap in bytes
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}
