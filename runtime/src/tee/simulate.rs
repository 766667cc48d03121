//! Software-only reference attestation.
//!
//! Reports are signed with an ECDSA P-384 key held in process memory, so
//! they prove nothing about the environment that produced them. The backend
//! exists for development and tests: it exercises the same attest/verify
//! contract as the hardware backends without any TEE.
//!
//! A report is a JSON document:
//!
//! ```json
//! {
//!   "userdata": "<base64>",
//!   "signature": "<base64, 96 bytes r||s>",
//!   "publickey": "<base64, SEC1>",
//!   "timestamp": 1735689600,
//!   "measurement": "insecure-software-no-hardware-root-of-trust",
//!   "nonce": "<base64, optional>"
//! }
//! ```
//!
//! The signature covers the SHA-384 digest of `userdata`.

use a3s_attest_core::config::{DEFAULT_MAX_USER_DATA, DEFAULT_VALIDITY_SECS};
use a3s_attest_core::error::{AttestError, Result};
use a3s_attest_core::{AttestOptions, Attester, Verifier, VerifyOptions};
use ecdsa::signature::hazmat::{PrehashVerifier, RandomizedPrehashSigner};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha384};

use super::policy::{check_measurement, check_nonce, check_timestamp};

/// Measurement label of every software report.
pub const SOFTWARE_MEASUREMENT: &str = "insecure-software-no-hardware-root-of-trust";

/// Length of a fixed-width P-384 `r || s` signature.
pub const SIGNATURE_SIZE: usize = 96;

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(bytes) => super::serialize(bytes, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// Wire form of a software report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareReport {
    #[serde(with = "base64_bytes")]
    pub userdata: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub publickey: Vec<u8>,
    /// Creation time, unix seconds
    pub timestamp: i64,
    pub measurement: String,
    #[serde(
        default,
        with = "base64_bytes::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub nonce: Option<Vec<u8>>,
}

impl SoftwareReport {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| AttestError::Verifier(format!("undecodable software report: {}", e)))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Attester backed by an in-memory signing key.
pub struct SoftwareAttester {
    signing_key: SigningKey,
    max_user_data: usize,
}

impl SoftwareAttester {
    /// Attester with a freshly generated key.
    pub fn new(max_user_data: usize) -> Self {
        Self::with_key(SigningKey::random(&mut OsRng), max_user_data)
    }

    /// Attester with a caller-supplied key, e.g. for deterministic tests.
    pub fn with_key(signing_key: SigningKey, max_user_data: usize) -> Self {
        Self {
            signing_key,
            max_user_data,
        }
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn max_user_data(&self) -> usize {
        self.max_user_data
    }
}

impl Default for SoftwareAttester {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_USER_DATA)
    }
}

impl Attester for SoftwareAttester {
    fn attest(&self, user_data: &[u8], opts: &AttestOptions) -> Result<Vec<u8>> {
        if user_data.len() > self.max_user_data {
            return Err(AttestError::InputTooLarge {
                len: user_data.len(),
                max: self.max_user_data,
            });
        }
        if opts.public_key.is_some() {
            tracing::debug!("Software attester does not bind a public key; ignoring it");
        }

        let digest = Sha384::digest(user_data);
        let signature: Signature = self
            .signing_key
            .sign_prehash_with_rng(&mut OsRng, &digest)
            .map_err(|e| AttestError::InvalidSignature(format!("signing failed: {}", e)))?;

        let report = SoftwareReport {
            userdata: user_data.to_vec(),
            signature: signature.to_bytes().to_vec(),
            publickey: self
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            timestamp: chrono::Utc::now().timestamp(),
            measurement: SOFTWARE_MEASUREMENT.to_string(),
            nonce: opts.nonce.clone(),
        };

        tracing::warn!("Producing software attestation report (no hardware root of trust)");
        report.to_bytes()
    }
}

/// Verifier for [`SoftwareReport`]s.
///
/// Trusts the key embedded in the report; the signature only proves the
/// report was not altered after signing.
#[derive(Debug, Clone)]
pub struct SoftwareVerifier {
    validity_secs: u64,
}

impl SoftwareVerifier {
    pub fn new() -> Self {
        Self {
            validity_secs: DEFAULT_VALIDITY_SECS,
        }
    }

    /// How long after creation a report is accepted.
    pub fn with_validity(mut self, validity_secs: u64) -> Self {
        self.validity_secs = validity_secs;
        self
    }
}

impl Default for SoftwareVerifier {
    fn default() -> Self {
        Self::new()
    }
}

fn verify_signature(report: &SoftwareReport) -> Result<()> {
    let key = VerifyingKey::from_sec1_bytes(&report.publickey)
        .map_err(|e| AttestError::InvalidSignature(format!("bad public key: {}", e)))?;
    if report.signature.len() != SIGNATURE_SIZE {
        return Err(AttestError::InvalidSignature(format!(
            "signature is {} bytes, expected {}",
            report.signature.len(),
            SIGNATURE_SIZE
        )));
    }
    let signature = Signature::from_slice(&report.signature)
        .map_err(|e| AttestError::InvalidSignature(format!("bad signature: {}", e)))?;
    let digest = Sha384::digest(&report.userdata);
    key.verify_prehash(&digest, &signature)
        .map_err(|_| AttestError::InvalidSignature("signature does not match user data".to_string()))
}

impl Verifier for SoftwareVerifier {
    fn verify(&self, report: &[u8], opts: &VerifyOptions) -> Result<Vec<u8>> {
        let report = SoftwareReport::from_bytes(report)?;
        verify_signature(&report)?;
        check_timestamp(
            report.timestamp,
            opts.verification_time().timestamp(),
            self.validity_secs,
        )?;
        check_measurement(&opts.measurement, &report.measurement)?;
        check_nonce(opts.nonce.as_deref(), report.nonce.as_deref())?;

        tracing::debug!(
            user_data_len = report.userdata.len(),
            timestamp = report.timestamp,
            "Software report verified"
        );
        Ok(report.userdata)
    }
}
