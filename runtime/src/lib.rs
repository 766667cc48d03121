//! A3S Attest Runtime - attesters and verifiers.
//!
//! This crate implements the uniform attest/verify contract from
//! `a3s-attest-core` for every supported backend.

pub mod tee;

// Re-export common types
pub use tee::{AttestBackend, BoxedDocumentVerifier, DeviceVerifier, VerifyBackend};
pub use a3s_attest_guest::nsm::is_nitro_enclave;
pub use tee::{NitroAttester, SevSnpAttester, TdxAttester};
pub use tee::{SoftwareAttester, SoftwareReport, SoftwareVerifier, SOFTWARE_MEASUREMENT};

/// A3S Attest Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
