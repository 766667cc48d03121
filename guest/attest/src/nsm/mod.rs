//! AWS Nitro Secure Module (NSM) client.
//!
//! The NSM device is available at `/dev/nsm` inside a Nitro Enclave and
//! provides attestation, PCR operations, and entropy generation. Every
//! operation is one keyed-envelope round trip over an [`NsmTransport`].
//!
//! Methods take `&mut self`: the device handle has no internal locking, so
//! callers sharing a client must serialize access themselves.

pub mod device;
pub mod envelope;
pub mod types;

use a3s_attest_core::error::{AttestError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_bytes::ByteBuf;
use std::path::Path;

pub use device::{NsmDevice, NsmTransport, NSM_REQUEST_MAX_SIZE, NSM_RESPONSE_MAX_SIZE};
pub use types::{NsmDescription, PcrInfo};

use types::*;

/// Check if running inside a Nitro Enclave, i.e. the NSM device node exists.
pub fn is_nitro_enclave(device: &Path) -> bool {
    device.exists()
}

/// Client for the Nitro Secure Module.
#[derive(Debug)]
pub struct NsmClient<T: NsmTransport = NsmDevice> {
    transport: T,
}

impl NsmClient<NsmDevice> {
    /// Open the NSM device at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(NsmDevice::open(path)?))
    }
}

impl<T: NsmTransport> NsmClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Give back the transport, e.g. to close the device.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn call<Req, Resp>(&mut self, operation: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let encoded = envelope::encode(operation, request)?;
        tracing::debug!(operation, request_len = encoded.len(), "NSM request");
        let response = self.transport.send(&encoded)?;
        tracing::debug!(operation, response_len = response.len(), "NSM response");
        envelope::decode(operation, &response)
    }

    /// Read a PCR and its lock state.
    pub fn describe_pcr(&mut self, index: u16) -> Result<PcrInfo> {
        let resp: DescribePcrResponse = self.call(OP_DESCRIBE_PCR, &PcrIndexRequest { index })?;
        let value = require_bytes(OP_DESCRIBE_PCR, "data", resp.data)?;
        Ok(PcrInfo {
            index,
            value,
            locked: resp.lock,
        })
    }

    /// Extend a PCR with `data`, returning the new register value.
    pub fn extend_pcr(&mut self, index: u16, data: &[u8]) -> Result<Vec<u8>> {
        let resp: ExtendPcrResponse = self.call(
            OP_EXTEND_PCR,
            &ExtendPcrRequest {
                index,
                data: ByteBuf::from(data.to_vec()),
            },
        )?;
        require_bytes(OP_EXTEND_PCR, "data", resp.data)
    }

    /// Lock a PCR. The device refuses later extensions.
    pub fn lock_pcr(&mut self, index: u16) -> Result<()> {
        self.call(OP_LOCK_PCR, &PcrIndexRequest { index })
    }

    /// Lock PCRs `0..end`.
    pub fn lock_pcrs(&mut self, end: u16) -> Result<()> {
        self.call(OP_LOCK_PCRS, &LockPcrsRequest { range: end })
    }

    /// Request a signed attestation document.
    pub fn get_attestation(
        &mut self,
        nonce: Option<&[u8]>,
        public_key: Option<&[u8]>,
        user_data: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let request = AttestationRequest {
            user_data: user_data.map(|d| ByteBuf::from(d.to_vec())),
            nonce: nonce.map(|d| ByteBuf::from(d.to_vec())),
            public_key: public_key.map(|d| ByteBuf::from(d.to_vec())),
        };
        let resp: AttestationResponse = self.call(OP_ATTESTATION, &request)?;
        require_bytes(OP_ATTESTATION, "document", resp.document)
    }

    /// Describe the NSM module.
    pub fn describe(&mut self) -> Result<NsmDescription> {
        let resp: DescribeNsmResponse = self.call(OP_DESCRIBE_NSM, &())?;
        if resp.module_id.is_empty() {
            return Err(missing(OP_DESCRIBE_NSM, "module_id"));
        }
        Ok(resp.into())
    }

    /// Collect exactly `length` random bytes.
    ///
    /// The device returns a chunk of unspecified size per call, so chunks are
    /// accumulated until enough bytes are available. An empty chunk is a
    /// protocol violation.
    pub fn get_random(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut random = Vec::with_capacity(length);
        while random.len() < length {
            let resp: GetRandomResponse = self.call(OP_GET_RANDOM, &())?;
            if resp.random.is_empty() {
                return Err(AttestError::Protocol(
                    "GetRandom returned an empty chunk".to_string(),
                ));
            }
            let needed = length - random.len();
            let take = resp.random.len().min(needed);
            random.extend_from_slice(&resp.random[..take]);
        }
        Ok(random)
    }
}

fn missing(operation: &str, field: &str) -> AttestError {
    AttestError::MissingValue {
        operation: operation.to_string(),
        field: field.to_string(),
    }
}

fn require_bytes(operation: &str, field: &str, value: ByteBuf) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Err(missing(operation, field));
    }
    Ok(value.into_vec())
}
