//! Docket Core
//!
//! Core types for the Docket submission-integrity pipeline:
//! - Content fingerprinting (SHA-256 digests as canonical identity)
//! - The Submission record and its status machine
//! - Verification attempt history
//! - Audit trail entries
//!
//! This crate performs no I/O beyond reading the byte stream handed to the
//! fingerprint engine.

pub mod fingerprint;
pub mod types;

pub use fingerprint::{Fingerprint, FingerprintError};
pub use types::*;
