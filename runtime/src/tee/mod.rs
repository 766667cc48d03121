//! TEE (Trusted Execution Environment) attestation backends.
//!
//! - `simulate`: Software reference attester/verifier (no hardware).
//! - `nitro`: AWS Nitro Enclaves attester over `/dev/nsm`.
//! - `tsm`: AMD SEV-SNP and Intel TDX attesters over configfs-tsm.
//! - `policy`: Verification checks shared by every verifier.
//! - `backend`: Runtime dispatch over the configured backend.

pub mod backend;
pub mod nitro;
pub mod policy;
pub mod simulate;
pub mod tsm;

pub use backend::{AttestBackend, BoxedDocumentVerifier, VerifyBackend};
pub use nitro::{pcr0_indicates_debug, NitroAttester};
pub use policy::{check_document, DeviceVerifier};
pub use simulate::{SoftwareAttester, SoftwareReport, SoftwareVerifier, SOFTWARE_MEASUREMENT};
pub use tsm::{SevSnpAttester, TdxAttester};
