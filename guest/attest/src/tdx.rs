//! Intel TDX quotes via configfs-tsm.

use a3s_attest_core::error::Result;
use a3s_attest_core::{ReportRequest, ReportResult};
use std::path::PathBuf;

use crate::tsm::{platform_report, ConfigFs, ReportFs};

/// Provider string the `tdx-guest` driver registers with the TSM core.
pub const TDX_PROVIDER: &str = "tdx_guest";

/// Width of the TDREPORT `REPORTDATA` field.
pub const TDX_REPORT_DATA_SIZE: usize = 64;

/// TDX quote client.
#[derive(Debug)]
pub struct TdxReportClient<F: ReportFs = ConfigFs> {
    fs: F,
    cert_table: bool,
}

impl TdxReportClient<ConfigFs> {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(ConfigFs::new(root)?))
    }
}

impl<F: ReportFs> TdxReportClient<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            cert_table: false,
        }
    }

    pub fn with_cert_table(mut self, enabled: bool) -> Self {
        self.cert_table = enabled;
        self
    }

    /// Request a quote binding `user_data` (at most 64 bytes).
    pub fn get_report(&self, user_data: &[u8]) -> Result<ReportResult> {
        let request = ReportRequest {
            in_blob: user_data.to_vec(),
            get_aux_blob: self.cert_table,
            ..Default::default()
        };
        let result = platform_report(&self.fs, TDX_PROVIDER, TDX_REPORT_DATA_SIZE, &request)?;
        tracing::debug!(
            provider = %result.provider,
            quote_len = result.out_blob.len(),
            "TDX quote acquired"
        );
        Ok(result)
    }
}
