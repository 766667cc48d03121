//! One configfs-tsm report acquisition.
//!
//! The kernel report interface has no transaction isolation: anything that
//! can write into the session directory can change the inputs between our
//! writes and the report read. The only observable signal of that is the
//! `generation` counter, which the kernel bumps on every attribute write.
//! A session therefore:
//!
//! 1. creates a private `entry*` directory (removed on every exit path),
//! 2. reads the baseline generation,
//! 3. writes each requested attribute, counting the writes,
//! 4. requires `generation == baseline + writes`,
//! 5. reads `outblob` and `provider` (plus `auxblob` / `manifestblob` when
//!    requested),
//! 6. requires the generation unchanged after the reads.
//!
//! Any mismatch fails the whole call and no data is returned.

use a3s_attest_core::error::{AttestError, Result};
use a3s_attest_core::{ReportRequest, ReportResult};
use std::path::{Path, PathBuf};

use super::configfs::ReportFs;

pub const ATTR_INBLOB: &str = "inblob";
pub const ATTR_OUTBLOB: &str = "outblob";
pub const ATTR_AUXBLOB: &str = "auxblob";
pub const ATTR_MANIFESTBLOB: &str = "manifestblob";
pub const ATTR_PROVIDER: &str = "provider";
pub const ATTR_GENERATION: &str = "generation";
pub const ATTR_PRIVLEVEL: &str = "privlevel";
pub const ATTR_PRIVLEVEL_FLOOR: &str = "privlevel_floor";
pub const ATTR_SERVICE_PROVIDER: &str = "service_provider";
pub const ATTR_SERVICE_GUID: &str = "service_guid";
pub const ATTR_SERVICE_MANIFEST_VERSION: &str = "service_manifest_version";

/// Highest privilege level the kernel accepts (`TSM_PRIVLEVEL_MAX`).
pub const TSM_PRIVLEVEL_MAX: u32 = 3;

/// Name pattern of session directories.
pub const ENTRY_PATTERN: &str = "entry*";

/// Removes the session directory when dropped.
struct EntryGuard<'a, F: ReportFs + ?Sized> {
    fs: &'a F,
    path: PathBuf,
}

impl<F: ReportFs + ?Sized> Drop for EntryGuard<'_, F> {
    fn drop(&mut self) {
        if let Err(e) = self.fs.remove_all(&self.path) {
            tracing::warn!(entry = %self.path.display(), "Failed to remove report entry: {}", e);
        }
    }
}

/// Report session controller over a [`ReportFs`] gateway.
pub struct ReportSession<'a, F: ReportFs + ?Sized> {
    fs: &'a F,
    dir: PathBuf,
}

impl<'a, F: ReportFs + ?Sized> ReportSession<'a, F> {
    /// Sessions create their entries directly under the gateway root.
    pub fn new(fs: &'a F) -> Self {
        Self {
            fs,
            dir: PathBuf::new(),
        }
    }

    /// Create entries under `dir`, relative to the gateway root.
    pub fn in_dir(fs: &'a F, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    /// Acquire exactly one report.
    pub fn get_report(&self, req: &ReportRequest) -> Result<ReportResult> {
        let entry = self.fs.mkdir_temp(&self.dir, ENTRY_PATTERN).map_err(|e| {
            AttestError::Unsupported(format!("cannot create report entry: {}", e))
        })?;
        let _guard = EntryGuard {
            fs: self.fs,
            path: entry.clone(),
        };
        tracing::debug!(entry = %entry.display(), "Created report entry");

        let baseline = self.read_generation(&entry)?;

        if let Some(level) = req.privilege {
            self.check_privilege(&entry, level)?;
        }

        let mut writes = 0u64;
        if !req.in_blob.is_empty() {
            self.write_attr(&entry, ATTR_INBLOB, &req.in_blob, &mut writes)?;
        }
        if let Some(level) = req.privilege {
            self.write_attr(&entry, ATTR_PRIVLEVEL, level.to_string().as_bytes(), &mut writes)?;
        }
        if let Some(ref provider) = req.service_provider {
            self.write_attr(&entry, ATTR_SERVICE_PROVIDER, provider.as_bytes(), &mut writes)?;
        }
        if let Some(ref guid) = req.service_guid {
            self.write_attr(&entry, ATTR_SERVICE_GUID, guid.as_bytes(), &mut writes)?;
        }
        if let Some(ref version) = req.service_manifest_version {
            self.write_attr(
                &entry,
                ATTR_SERVICE_MANIFEST_VERSION,
                version.as_bytes(),
                &mut writes,
            )?;
        }

        let expected = baseline + writes;
        let observed = self.read_generation(&entry)?;
        if observed != expected {
            return Err(AttestError::GenerationMismatch { expected, observed });
        }

        let out_blob = self.read_mandatory(&entry, ATTR_OUTBLOB)?;
        let provider = String::from_utf8_lossy(&self.read_mandatory(&entry, ATTR_PROVIDER)?)
            .trim_end()
            .to_string();
        let aux_blob = if req.get_aux_blob {
            Some(self.read_attr(&entry, ATTR_AUXBLOB)?)
        } else {
            None
        };
        let manifest_blob = if req.get_manifest_blob {
            Some(self.read_attr(&entry, ATTR_MANIFESTBLOB)?)
        } else {
            None
        };

        let after = self.read_generation(&entry)?;
        if after != expected {
            return Err(AttestError::GenerationMismatch {
                expected,
                observed: after,
            });
        }

        tracing::debug!(
            provider = %provider,
            generation = after,
            out_len = out_blob.len(),
            "Report session complete"
        );

        Ok(ReportResult {
            out_blob,
            aux_blob,
            manifest_blob,
            provider,
        })
    }

    fn check_privilege(&self, entry: &Path, level: u32) -> Result<()> {
        let floor = self.read_u64(entry, ATTR_PRIVLEVEL_FLOOR)?;
        let floor = u32::try_from(floor).map_err(|_| {
            AttestError::Session(format!("{} value {} out of range", ATTR_PRIVLEVEL_FLOOR, floor))
        })?;
        if level < floor || level > TSM_PRIVLEVEL_MAX {
            return Err(AttestError::PrivilegeOutOfRange {
                level,
                floor,
                ceiling: TSM_PRIVLEVEL_MAX,
            });
        }
        Ok(())
    }

    fn write_attr(&self, entry: &Path, attr: &str, value: &[u8], writes: &mut u64) -> Result<()> {
        self.fs
            .write_file(&entry.join(attr), value)
            .map_err(|source| AttestError::AttributeWrite {
                attribute: attr.to_string(),
                source,
            })?;
        *writes += 1;
        Ok(())
    }

    fn read_attr(&self, entry: &Path, attr: &str) -> Result<Vec<u8>> {
        self.fs
            .read_file(&entry.join(attr))
            .map_err(|e| AttestError::Session(format!("failed to read {}: {}", attr, e)))
    }

    fn read_mandatory(&self, entry: &Path, attr: &str) -> Result<Vec<u8>> {
        let value = self.read_attr(entry, attr)?;
        if value.is_empty() {
            return Err(AttestError::MissingValue {
                operation: "report".to_string(),
                field: attr.to_string(),
            });
        }
        Ok(value)
    }

    fn read_u64(&self, entry: &Path, attr: &str) -> Result<u64> {
        let raw = self.read_attr(entry, attr)?;
        let text = String::from_utf8_lossy(&raw);
        text.trim().parse::<u64>().map_err(|e| {
            AttestError::Session(format!("failed to parse {} {:?}: {}", attr, text.trim(), e))
        })
    }

    fn read_generation(&self, entry: &Path) -> Result<u64> {
        self.read_u64(entry, ATTR_GENERATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsm::fake::FakeTsm;
    use a3s_attest_core::error::ErrorKind;

    fn request(data: &[u8]) -> ReportRequest {
        ReportRequest {
            in_blob: data.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_get_report_success() {
        let tsm = FakeTsm::new("sev_guest");
        let result = ReportSession::new(&tsm).get_report(&request(b"hello")).unwrap();
        assert_eq!(result.out_blob, FakeTsm::report_for(b"hello"));
        assert_eq!(result.provider, "sev_guest");
        assert!(result.aux_blob.is_none());
        assert!(result.manifest_blob.is_none());
        assert_eq!(tsm.live_entries(), 0);
        assert_eq!(tsm.entries_created(), 1);
    }

    #[test]
    fn test_get_report_optional_blobs() {
        let tsm = FakeTsm::new("sev_guest");
        let req = ReportRequest {
            in_blob: b"data".to_vec(),
            get_aux_blob: true,
            get_manifest_blob: true,
            ..Default::default()
        };
        let result = ReportSession::new(&tsm).get_report(&req).unwrap();
        assert_eq!(result.aux_blob.as_deref(), Some(&FakeTsm::AUX_BLOB[..]));
        assert_eq!(result.manifest_blob.as_deref(), Some(&FakeTsm::MANIFEST_BLOB[..]));
    }

    #[test]
    fn test_all_attributes_written() {
        let tsm = FakeTsm::new("sev_guest");
        let req = ReportRequest {
            in_blob: b"data".to_vec(),
            privilege: Some(2),
            service_provider: Some("svsm".to_string()),
            service_guid: Some("c476f1eb-0123-45a5-9641-b4e7dde5bfe3".to_string()),
            service_manifest_version: Some("1".to_string()),
            ..Default::default()
        };
        ReportSession::new(&tsm).get_report(&req).unwrap();
        assert_eq!(
            tsm.written(),
            vec![
                (ATTR_INBLOB.to_string(), b"data".to_vec()),
                (ATTR_PRIVLEVEL.to_string(), b"2".to_vec()),
                (ATTR_SERVICE_PROVIDER.to_string(), b"svsm".to_vec()),
                (
                    ATTR_SERVICE_GUID.to_string(),
                    b"c476f1eb-0123-45a5-9641-b4e7dde5bfe3".to_vec()
                ),
                (ATTR_SERVICE_MANIFEST_VERSION.to_string(), b"1".to_vec()),
            ]
        );
    }

    #[test]
    fn test_empty_in_blob_not_written() {
        let tsm = FakeTsm::new("tdx_guest");
        ReportSession::new(&tsm).get_report(&request(b"")).unwrap();
        assert!(tsm.written().is_empty());
    }

    #[test]
    fn test_generation_bumped_between_writes_and_check() {
        let tsm = FakeTsm::new("sev_guest");
        tsm.interfere_after_write(ATTR_INBLOB);
        let err = ReportSession::new(&tsm).get_report(&request(b"x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationMismatch);
        assert_eq!(tsm.live_entries(), 0);
    }

    #[test]
    fn test_generation_bumped_during_output_read() {
        let tsm = FakeTsm::new("sev_guest");
        tsm.interfere_on_read(ATTR_OUTBLOB);
        let err = ReportSession::new(&tsm).get_report(&request(b"x")).unwrap_err();
        assert!(matches!(
            err,
            AttestError::GenerationMismatch {
                expected: 1,
                observed: 2
            }
        ));
        assert_eq!(tsm.live_entries(), 0);
    }

    #[test]
    fn test_write_failure_names_attribute() {
        let tsm = FakeTsm::new("sev_guest");
        tsm.fail_write(ATTR_SERVICE_GUID);
        let req = ReportRequest {
            in_blob: b"x".to_vec(),
            service_guid: Some("guid".to_string()),
            ..Default::default()
        };
        let err = ReportSession::new(&tsm).get_report(&req).unwrap_err();
        match err {
            AttestError::AttributeWrite { ref attribute, .. } => {
                assert_eq!(attribute, ATTR_SERVICE_GUID)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(tsm.live_entries(), 0);
    }

    #[test]
    fn test_privilege_above_ceiling_rejected_before_writes() {
        let tsm = FakeTsm::new("sev_guest");
        let req = ReportRequest {
            in_blob: b"x".to_vec(),
            privilege: Some(TSM_PRIVLEVEL_MAX + 1),
            ..Default::default()
        };
        let err = ReportSession::new(&tsm).get_report(&req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(tsm.written().is_empty());
        assert_eq!(tsm.live_entries(), 0);
    }

    #[test]
    fn test_privilege_below_floor_rejected() {
        let tsm = FakeTsm::new("sev_guest");
        tsm.set_privlevel_floor(2);
        let req = ReportRequest {
            privilege: Some(1),
            ..Default::default()
        };
        let err = ReportSession::new(&tsm).get_report(&req).unwrap_err();
        assert!(matches!(
            err,
            AttestError::PrivilegeOutOfRange {
                level: 1,
                floor: 2,
                ceiling: 3
            }
        ));
    }

    #[test]
    fn test_mkdir_failure_is_unsupported() {
        let tsm = FakeTsm::new("sev_guest");
        tsm.fail_mkdir();
        let err = ReportSession::new(&tsm).get_report(&request(b"x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_empty_outblob_is_missing_value() {
        let tsm = FakeTsm::new("sev_guest");
        tsm.set_empty_outblob();
        let err = ReportSession::new(&tsm).get_report(&request(b"x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingValue);
        assert_eq!(tsm.live_entries(), 0);
    }

    #[test]
    fn test_missing_provider_is_fatal() {
        let tsm = FakeTsm::new("");
        let err = ReportSession::new(&tsm).get_report(&request(b"x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingValue);
    }
}
