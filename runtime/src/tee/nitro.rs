//! AWS Nitro Enclaves attestation.
//!
//! Documents come straight from the Nitro Secure Module. Verification of the
//! COSE signature and AWS certificate chain is left to a
//! [`DocumentVerifier`](a3s_attest_core::DocumentVerifier) wrapped in a
//! [`DeviceVerifier`](super::policy::DeviceVerifier).

use a3s_attest_core::error::Result;
use a3s_attest_core::{AttestOptions, Attester};
use a3s_attest_guest::nsm::{NsmClient, NsmDevice, NsmTransport};
use std::path::Path;
use std::sync::Mutex;

/// Debug-mode enclaves report PCR0 as all zeros.
pub fn pcr0_indicates_debug(pcr0: &[u8]) -> bool {
    !pcr0.is_empty() && pcr0.iter().all(|&b| b == 0)
}

/// Attester over the NSM device.
pub struct NitroAttester<T: NsmTransport = NsmDevice> {
    client: Mutex<NsmClient<T>>,
}

impl NitroAttester<NsmDevice> {
    pub fn open(device: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(NsmClient::open(device)?))
    }
}

impl<T: NsmTransport> NitroAttester<T> {
    pub fn new(client: NsmClient<T>) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }
}

impl<T: NsmTransport> Attester for NitroAttester<T> {
    fn attest(&self, user_data: &[u8], opts: &AttestOptions) -> Result<Vec<u8>> {
        let user_data = (!user_data.is_empty()).then_some(user_data);
        // One request in flight per device handle.
        let mut client = self.client.lock().unwrap_or_else(|e| e.into_inner());
        let document = client.get_attestation(
            opts.nonce.as_deref(),
            opts.public_key.as_deref(),
            user_data,
        )?;
        tracing::debug!(document_len = document.len(), "NSM attestation document");
        Ok(document)
    }
}
