//! AMD SEV-SNP attestation reports via configfs-tsm.

use a3s_attest_core::error::Result;
use a3s_attest_core::{ReportRequest, ReportResult};
use std::path::PathBuf;

use crate::tsm::{platform_report, ConfigFs, ReportFs};

/// Provider string the `sev-guest` driver registers with the TSM core.
pub const SEV_PROVIDER: &str = "sev_guest";

/// Width of the SNP report `REPORT_DATA` field.
pub const SEV_REPORT_DATA_SIZE: usize = 64;

/// SEV-SNP report client.
#[derive(Debug)]
pub struct SevReportClient<F: ReportFs = ConfigFs> {
    fs: F,
    cert_table: bool,
    privilege: Option<u32>,
}

impl SevReportClient<ConfigFs> {
    /// Client over the configfs-tsm root at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(ConfigFs::new(root)?))
    }
}

impl<F: ReportFs> SevReportClient<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            cert_table: false,
            privilege: None,
        }
    }

    /// Also fetch the certificate table (returned as the aux blob).
    pub fn with_cert_table(mut self, enabled: bool) -> Self {
        self.cert_table = enabled;
        self
    }

    /// VMPL to request the report at.
    pub fn with_privilege(mut self, level: u32) -> Self {
        self.privilege = Some(level);
        self
    }

    /// Request a report binding `user_data` (at most 64 bytes).
    pub fn get_report(&self, user_data: &[u8]) -> Result<ReportResult> {
        let request = ReportRequest {
            in_blob: user_data.to_vec(),
            get_aux_blob: self.cert_table,
            privilege: self.privilege,
            ..Default::default()
        };
        let result = platform_report(&self.fs, SEV_PROVIDER, SEV_REPORT_DATA_SIZE, &request)?;
        tracing::debug!(
            provider = %result.provider,
            report_len = result.out_blob.len(),
            cert_table = result.aux_blob.is_some(),
            "SEV-SNP report acquired"
        );
        Ok(result)
    }
}
