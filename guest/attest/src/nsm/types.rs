//! NSM request/response payloads and the records returned to callers.
//!
//! Field names and byte-string encodings follow the Nitro Secure Module CBOR
//! ABI, so the payloads can be exchanged with `/dev/nsm` as-is.

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use std::collections::BTreeSet;

pub const OP_DESCRIBE_PCR: &str = "DescribePCR";
pub const OP_EXTEND_PCR: &str = "ExtendPCR";
pub const OP_LOCK_PCR: &str = "LockPCR";
pub const OP_LOCK_PCRS: &str = "LockPCRs";
pub const OP_DESCRIBE_NSM: &str = "DescribeNSM";
pub const OP_ATTESTATION: &str = "Attestation";
pub const OP_GET_RANDOM: &str = "GetRandom";

/// Envelope key the device uses for error responses.
pub const OP_ERROR: &str = "Error";

#[derive(Debug, Serialize)]
pub(crate) struct PcrIndexRequest {
    pub index: u16,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExtendPcrRequest {
    pub index: u16,
    pub data: ByteBuf,
}

#[derive(Debug, Serialize)]
pub(crate) struct LockPcrsRequest {
    pub range: u16,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttestationRequest {
    pub user_data: Option<ByteBuf>,
    pub nonce: Option<ByteBuf>,
    pub public_key: Option<ByteBuf>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescribePcrResponse {
    pub lock: bool,
    pub data: ByteBuf,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtendPcrResponse {
    pub data: ByteBuf,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescribeNsmResponse {
    pub version_major: u16,
    pub version_minor: u16,
    pub version_patch: u16,
    pub module_id: String,
    pub max_pcrs: u16,
    pub locked_pcrs: BTreeSet<u16>,
    pub digest: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttestationResponse {
    pub document: ByteBuf,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetRandomResponse {
    pub random: ByteBuf,
}

/// State of one platform configuration register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcrInfo {
    pub index: u16,
    /// Current register value
    pub value: Vec<u8>,
    /// Whether further extension is refused
    pub locked: bool,
}

/// NSM module metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsmDescription {
    pub version_major: u16,
    pub version_minor: u16,
    pub version_patch: u16,
    pub module_id: String,
    /// Number of PCRs exposed by the module
    pub max_pcrs: u16,
    pub locked_pcrs: Vec<u16>,
    /// Digest algorithm, e.g. `SHA384`
    pub digest: String,
}

impl From<DescribeNsmResponse> for NsmDescription {
    fn from(resp: DescribeNsmResponse) -> Self {
        Self {
            version_major: resp.version_major,
            version_minor: resp.version_minor,
            version_patch: resp.version_patch,
            module_id: resp.module_id,
            max_pcrs: resp.max_pcrs,
            locked_pcrs: resp.locked_pcrs.into_iter().collect(),
            digest: resp.digest,
        }
    }
}
