//! The uniform attestation contract.
//!
//! Every backend implements [`Attester`] and [`Verifier`] with identical
//! semantics: `attest` binds caller user data into a report, and `verify`
//! returns that user data only when every requested check passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::options::{AttestOptions, VerifyOptions};

/// Produces attestation reports.
pub trait Attester {
    fn attest(&self, user_data: &[u8], opts: &AttestOptions) -> Result<Vec<u8>>;
}

/// Checks attestation reports and extracts the bound user data.
pub trait Verifier {
    fn verify(&self, report: &[u8], opts: &VerifyOptions) -> Result<Vec<u8>>;
}

/// Closed set of supported backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Self-contained ECDSA reference implementation, no hardware.
    #[default]
    Software,
    /// AWS Nitro Enclaves via `/dev/nsm`.
    Nitro,
    /// AMD SEV-SNP via configfs-tsm.
    SevSnp,
    /// Intel TDX via configfs-tsm.
    Tdx,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software => write!(f, "software"),
            Self::Nitro => write!(f, "nitro"),
            Self::SevSnp => write!(f, "sev-snp"),
            Self::Tdx => write!(f, "tdx"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "software" | "simulate" => Ok(Self::Software),
            "nitro" => Ok(Self::Nitro),
            "sev-snp" | "sev" | "snp" => Ok(Self::SevSnp),
            "tdx" => Ok(Self::Tdx),
            _ => Err(format!(
                "unknown backend: '{}' (supported: software, nitro, sev-snp, tdx)",
                s
            )),
        }
    }
}

/// Inputs of one configfs-tsm report session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRequest {
    /// User data written to `inblob`.
    pub in_blob: Vec<u8>,
    /// Also read `auxblob` (e.g. the SEV-SNP certificate table).
    pub get_aux_blob: bool,
    /// Also read `manifestblob`.
    pub get_manifest_blob: bool,
    /// Privilege level written to `privlevel`.
    pub privilege: Option<u32>,
    pub service_provider: Option<String>,
    pub service_guid: Option<String>,
    pub service_manifest_version: Option<String>,
}

/// Outputs of one configfs-tsm report session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResult {
    /// Primary report bytes (`outblob`).
    pub out_blob: Vec<u8>,
    pub aux_blob: Option<Vec<u8>>,
    pub manifest_blob: Option<Vec<u8>>,
    /// Identity of the backend that produced the report.
    pub provider: String,
}

/// Claims extracted from a hardware document after its signature chain was
/// validated by a [`DocumentVerifier`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedDocument {
    /// Measurement registers by index. Index 0 is the primary measurement
    /// (Nitro PCR0, SEV-SNP MEASUREMENT, TDX MRTD).
    pub measurements: BTreeMap<u16, Vec<u8>>,
    pub user_data: Vec<u8>,
    /// Document creation time.
    pub timestamp: DateTime<Utc>,
    pub nonce: Option<Vec<u8>>,
    /// Whether the producing environment runs in debug mode.
    pub debug: bool,
}

impl VerifiedDocument {
    /// Hex encoding of the primary measurement, or empty if absent.
    pub fn primary_measurement(&self) -> String {
        self.measurements
            .get(&0)
            .map(hex::encode)
            .unwrap_or_default()
    }
}

/// Vendor certificate-chain validation, treated as a black box.
pub trait DocumentVerifier {
    fn verify(&self, document: &[u8], now: DateTime<Utc>) -> Result<VerifiedDocument>;
}

impl<T: DocumentVerifier + ?Sized> DocumentVerifier for Box<T> {
    fn verify(&self, document: &[u8], now: DateTime<Utc>) -> Result<VerifiedDocument> {
        (**self).verify(document, now)
    }
}
