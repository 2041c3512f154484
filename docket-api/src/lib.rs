//! Docket API Server
//!
//! REST surface over the submission-integrity pipeline.
//!
//! ## Endpoints
//!
//! ### Submissions
//! - POST /api/v1/submissions - Upload and anchor a submission (multipart)
//! - GET /api/v1/submissions - List submissions (owner/status filters)
//! - GET /api/v1/submissions/:id - Get one submission
//! - GET /api/v1/submissions/:id/download - Download the submitted blob
//!
//! ### Integrity
//! - POST /api/v1/submissions/:id/verify - Reconcile against the ledger
//! - PUT /api/v1/submissions/:id/grade - One-time grade
//!
//! ### Audit
//! - GET /api/v1/audit - Audit trail, newest first
//!
//! ### Health
//! - GET /health, GET /ready

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use dto::*;
pub use error::*;
pub use routes::*;
pub use server::*;
pub use state::*;
