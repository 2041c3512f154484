//! Docket Pipeline
//!
//! The integrity pipeline around the Local Record Store and the Ledger
//! Client:
//! - [`SubmissionCoordinator`] - fingerprint, duplicate-check, anchor,
//!   record, with rollback of partial work on failure
//! - [`VerificationReconciler`] - compare the stored fingerprint against the
//!   ledger's for the same submission and append the verdict to history
//! - [`GradingService`] - one-time, ledger-first grade application

pub mod coordinator;
pub mod error;
pub mod grading;
pub mod reconciler;

pub use coordinator::{SubmissionCoordinator, SubmitRequest};
pub use error::{DuplicateSource, PipelineError, PipelineResult};
pub use grading::GradingService;
pub use reconciler::VerificationReconciler;
