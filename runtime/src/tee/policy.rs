//! Verification policy.
//!
//! Every verifier applies the same checks once a report's signature is
//! trusted: validity window, expected measurement, debug mode and nonce.
//! Hardware verifiers run them over the claims a [`DocumentVerifier`]
//! extracted; the software verifier runs them over its own report format.

use a3s_attest_core::config::DEFAULT_VALIDITY_SECS;
use a3s_attest_core::error::{AttestError, Result};
use a3s_attest_core::{Backend, DocumentVerifier, VerifiedDocument, Verifier, VerifyOptions};

use super::nitro::pcr0_indicates_debug;

/// `created <= now <= created + validity_secs`, all in unix seconds.
pub(crate) fn check_timestamp(created: i64, now: i64, validity_secs: u64) -> Result<()> {
    let validity = i64::try_from(validity_secs).unwrap_or(i64::MAX);
    let not_after = created.saturating_add(validity);
    if now < created || now > not_after {
        return Err(AttestError::Timestamp {
            timestamp: now,
            not_before: created,
            not_after,
        });
    }
    Ok(())
}

/// An empty expectation accepts any measurement; otherwise the label must
/// match exactly.
pub(crate) fn check_measurement(expected: &str, actual: &str) -> Result<()> {
    if !expected.is_empty() && expected != actual {
        return Err(AttestError::Measurement {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// A supplied nonce must be present in the report and equal.
pub(crate) fn check_nonce(expected: Option<&[u8]>, actual: Option<&[u8]>) -> Result<()> {
    match expected {
        Some(expected) if actual != Some(expected) => Err(AttestError::Nonce),
        _ => Ok(()),
    }
}

/// Apply every check in `opts` to a validated document.
pub fn check_document(doc: &VerifiedDocument, opts: &VerifyOptions, validity_secs: u64) -> Result<()> {
    check_timestamp(
        doc.timestamp.timestamp(),
        opts.verification_time().timestamp(),
        validity_secs,
    )?;
    // Hardware measurements are lowercase hex; accept either case from callers.
    check_measurement(&opts.measurement.to_ascii_lowercase(), &doc.primary_measurement())?;
    if doc.debug && !opts.debug {
        return Err(AttestError::Debug(
            "report was produced in debug mode".to_string(),
        ));
    }
    if doc.debug {
        tracing::warn!("Accepting report produced in debug mode");
    }
    check_nonce(opts.nonce.as_deref(), doc.nonce.as_deref())
}

/// Verifier for hardware documents.
///
/// Certificate-chain validation is delegated to `V`; this type only applies
/// the policy to the claims it returns.
pub struct DeviceVerifier<V: DocumentVerifier> {
    backend: Backend,
    documents: V,
    validity_secs: u64,
}

impl<V: DocumentVerifier> DeviceVerifier<V> {
    pub fn new(backend: Backend, documents: V) -> Self {
        Self {
            backend,
            documents,
            validity_secs: DEFAULT_VALIDITY_SECS,
        }
    }

    /// How long after creation a document is accepted.
    pub fn with_validity(mut self, validity_secs: u64) -> Self {
        self.validity_secs = validity_secs;
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}

impl<V: DocumentVerifier> Verifier for DeviceVerifier<V> {
    fn verify(&self, report: &[u8], opts: &VerifyOptions) -> Result<Vec<u8>> {
        let now = opts.verification_time();
        let mut doc = self.documents.verify(report, now)?;

        if self.backend == Backend::Nitro {
            if let Some(pcr0) = doc.measurements.get(&0) {
                doc.debug |= pcr0_indicates_debug(pcr0);
            }
        }

        check_document(&doc, opts, self.validity_secs)?;
        tracing::debug!(
            backend = %self.backend,
            measurement = %doc.primary_measurement(),
            "Document verified"
        );
        Ok(doc.user_data)
    }
}
