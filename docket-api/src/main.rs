//! Docket server binary
//!
//! Configuration comes from the environment:
//! - DOCKET_HOST / DOCKET_PORT - listen address (default 0.0.0.0:8080)
//! - DOCKET_DATA_DIR - data directory for the SQLite store and blobs
//! - DOCKET_STORE - `sqlite` (default) or `memory`
//! - DOCKET_LEDGER_URL - base URL of the ledger API
//! - DOCKET_LEDGER_TIMEOUT_SECS - per-request ledger timeout (default 30)

use std::path::PathBuf;
use std::sync::Arc;

use docket_api::{run_server, ApiConfig, AppState};
use docket_ledger::{HttpLedgerClient, RetryConfig};
use docket_store::{
    AuditTrail, FsBlobStore, MemoryStore, SqliteStore, SqliteStoreOptions, SubmissionStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ApiConfig {
        host: env_or("DOCKET_HOST", "0.0.0.0"),
        port: env_or("DOCKET_PORT", "8080").parse()?,
        ..Default::default()
    };

    let data_dir = PathBuf::from(env_or("DOCKET_DATA_DIR", "./data"));
    let ledger_url = env_or("DOCKET_LEDGER_URL", "http://localhost:9090");
    let ledger_timeout: u64 = env_or("DOCKET_LEDGER_TIMEOUT_SECS", "30").parse()?;

    let (store, audit): (Arc<dyn SubmissionStore>, Arc<dyn AuditTrail>) =
        match env_or("DOCKET_STORE", "sqlite").as_str() {
            "memory" => {
                tracing::warn!("Using in-memory record store; records will not survive restart");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
            _ => {
                let store = Arc::new(
                    SqliteStore::open(SqliteStoreOptions::new(data_dir.join("docket.sqlite")))
                        .await?,
                );
                (store.clone(), store)
            }
        };

    let blobs = Arc::new(FsBlobStore::new(data_dir.join("blobs")));
    let ledger = Arc::new(HttpLedgerClient::with_config(
        &ledger_url,
        ledger_timeout,
        RetryConfig::default(),
    ));

    tracing::info!(ledger_url = %ledger_url, data_dir = %data_dir.display(), "Starting Docket");

    let state = AppState::new(store, audit, blobs, ledger);
    run_server(config, state).await
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
