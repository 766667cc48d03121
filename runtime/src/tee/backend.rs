//! Backend dispatch.
//!
//! [`AttestBackend`] and [`VerifyBackend`] pick the implementation for a
//! [`Backend`] at runtime and delegate the contract calls to it.

use a3s_attest_core::error::{AttestError, Result};
use a3s_attest_core::{
    AttestConfig, AttestOptions, Attester, Backend, DocumentVerifier, Verifier, VerifyOptions,
};

use super::nitro::NitroAttester;
use super::policy::DeviceVerifier;
use super::simulate::{SoftwareAttester, SoftwareVerifier};
use super::tsm::{SevSnpAttester, TdxAttester};

/// Boxed certificate-chain verifier supplied by the caller.
pub type BoxedDocumentVerifier = Box<dyn DocumentVerifier + Send + Sync>;

/// A configured attester.
pub enum AttestBackend {
    Software(SoftwareAttester),
    Nitro(NitroAttester),
    SevSnp(SevSnpAttester),
    Tdx(TdxAttester),
}

impl AttestBackend {
    /// Open the attester selected by `config`.
    pub fn from_config(config: &AttestConfig) -> Result<Self> {
        let backend = match config.backend {
            Backend::Software => Self::Software(SoftwareAttester::new(config.max_user_data)),
            Backend::Nitro => Self::Nitro(NitroAttester::open(&config.nsm_device)?),
            Backend::SevSnp => Self::SevSnp(SevSnpAttester::open(&config.tsm_root)?),
            Backend::Tdx => Self::Tdx(TdxAttester::open(&config.tsm_root)?),
        };
        tracing::debug!(backend = %backend.backend(), "Attester ready");
        Ok(backend)
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Software(_) => Backend::Software,
            Self::Nitro(_) => Backend::Nitro,
            Self::SevSnp(_) => Backend::SevSnp,
            Self::Tdx(_) => Backend::Tdx,
        }
    }
}

impl Attester for AttestBackend {
    fn attest(&self, user_data: &[u8], opts: &AttestOptions) -> Result<Vec<u8>> {
        match self {
            Self::Software(a) => a.attest(user_data, opts),
            Self::Nitro(a) => a.attest(user_data, opts),
            Self::SevSnp(a) => a.attest(user_data, opts),
            Self::Tdx(a) => a.attest(user_data, opts),
        }
    }
}

/// A configured verifier.
pub enum VerifyBackend {
    Software(SoftwareVerifier),
    /// Hardware documents of the given backend.
    Device(DeviceVerifier<BoxedDocumentVerifier>),
}

impl VerifyBackend {
    /// Build the verifier selected by `config`.
    ///
    /// Hardware backends need `documents` to validate vendor signatures;
    /// without one they are unsupported.
    pub fn from_config(
        config: &AttestConfig,
        documents: Option<BoxedDocumentVerifier>,
    ) -> Result<Self> {
        match (config.backend, documents) {
            (Backend::Software, _) => Ok(Self::Software(
                SoftwareVerifier::new().with_validity(config.validity_secs),
            )),
            (backend, Some(documents)) => Ok(Self::Device(
                DeviceVerifier::new(backend, documents).with_validity(config.validity_secs),
            )),
            (backend, None) => Err(AttestError::Unsupported(format!(
                "verifying {} reports requires a document verifier",
                backend
            ))),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Software(_) => Backend::Software,
            Self::Device(v) => v.backend(),
        }
    }
}

impl Verifier for VerifyBackend {
    fn verify(&self, report: &[u8], opts: &VerifyOptions) -> Result<Vec<u8>> {
        match self {
            Self::Software(v) => v.verify(report, opts),
            Self::Device(v) => v.verify(report, opts),
        }
    }
}
