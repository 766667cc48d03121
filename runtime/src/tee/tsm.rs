//! SEV-SNP and TDX attesters over configfs-tsm.
//!
//! The report-data field of both platforms is 64 bytes, so user data is
//! written as-is and longer input is refused. Nonce and public key options
//! have no slot of their own; callers fold them into the user data.

use a3s_attest_core::error::Result;
use a3s_attest_core::{AttestOptions, Attester};
use a3s_attest_guest::tsm::{ConfigFs, ReportFs};
use a3s_attest_guest::{SevReportClient, TdxReportClient};
use std::path::PathBuf;

fn note_unbound_options(backend: &str, opts: &AttestOptions) {
    if opts.nonce.is_some() || opts.public_key.is_some() {
        tracing::warn!(
            backend,
            "Nonce and public key are not bound separately; include them in user data"
        );
    }
}

/// SEV-SNP attester.
pub struct SevSnpAttester<F: ReportFs = ConfigFs> {
    client: SevReportClient<F>,
}

impl SevSnpAttester<ConfigFs> {
    pub fn open(tsm_root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(SevReportClient::open(tsm_root)?))
    }
}

impl<F: ReportFs> SevSnpAttester<F> {
    pub fn new(client: SevReportClient<F>) -> Self {
        Self { client }
    }
}

impl<F: ReportFs> Attester for SevSnpAttester<F> {
    fn attest(&self, user_data: &[u8], opts: &AttestOptions) -> Result<Vec<u8>> {
        note_unbound_options("sev-snp", opts);
        Ok(self.client.get_report(user_data)?.out_blob)
    }
}

/// TDX attester.
pub struct TdxAttester<F: ReportFs = ConfigFs> {
    client: TdxReportClient<F>,
}

impl TdxAttester<ConfigFs> {
    pub fn open(tsm_root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(TdxReportClient::open(tsm_root)?))
    }
}

impl<F: ReportFs> TdxAttester<F> {
    pub fn new(client: TdxReportClient<F>) -> Self {
        Self { client }
    }
}

impl<F: ReportFs> Attester for TdxAttester<F> {
    fn attest(&self, user_data: &[u8], opts: &AttestOptions) -> Result<Vec<u8>> {
        note_unbound_options("tdx", opts);
        Ok(self.client.get_report(user_data)?.out_blob)
    }
}
