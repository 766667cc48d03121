//! A3S Attest Core - Foundational Types and Abstractions
//!
//! This crate provides the attestation contract, the uniform option set,
//! the error taxonomy and configuration shared by every backend.

pub mod config;
pub mod error;
pub mod options;
pub mod tee;

// Re-export commonly used types
pub use config::{AttestConfig, LogLevel};
pub use error::{AttestError, ErrorKind, Result};
pub use options::{AttestOptions, VerifyOptions};
pub use tee::{
    Attester, Backend, DocumentVerifier, ReportRequest, ReportResult, VerifiedDocument, Verifier,
};

/// A3S Attest version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
