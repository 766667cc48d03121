//! Guest-side attestation report acquisition for a3s-attest.
//!
//! Two kernel interfaces are driven from inside the confidential guest:
//! the Nitro Secure Module character device ([`nsm`]) and the configfs-tsm
//! report directory shared by SEV-SNP ([`sev`]) and TDX ([`tdx`]).

pub mod ioctl;
pub mod nsm;
pub mod sev;
pub mod tdx;
pub mod tsm;

pub use nsm::{NsmClient, NsmDescription, NsmDevice, NsmTransport, PcrInfo};
pub use sev::SevReportClient;
pub use tdx::TdxReportClient;
pub use tsm::{ConfigFs, ReportFs, ReportSession};
