//! configfs-tsm report acquisition.
//!
//! The Linux TSM report interface (`/sys/kernel/config/tsm/report`) serves
//! both AMD SEV-SNP and Intel TDX guests. A report is produced by creating a
//! session directory, writing attributes into it and reading the output
//! files back; see [`session`] for the consistency rules.

pub mod configfs;
pub mod session;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use configfs::{ConfigFs, ReportFs};
pub use session::{ReportSession, TSM_PRIVLEVEL_MAX};

use a3s_attest_core::error::{AttestError, Result};
use a3s_attest_core::{ReportRequest, ReportResult};

/// Run one report session for a platform family and check who answered.
///
/// `max_in_blob` is the width of the family's report-data field; longer
/// input would be truncated by hardware, so it is rejected up front.
pub(crate) fn platform_report<F: ReportFs + ?Sized>(
    fs: &F,
    expected_provider: &str,
    max_in_blob: usize,
    request: &ReportRequest,
) -> Result<ReportResult> {
    if request.in_blob.len() > max_in_blob {
        return Err(AttestError::InputTooLarge {
            len: request.in_blob.len(),
            max: max_in_blob,
        });
    }

    let result = ReportSession::new(fs).get_report(request)?;

    if !result.provider.contains(expected_provider) {
        return Err(AttestError::ProviderMismatch {
            expected: expected_provider.to_string(),
            actual: result.provider,
        });
    }
    Ok(result)
}
