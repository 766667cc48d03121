//! Report sessions over a real directory tree.

use a3s_attest_core::error::ErrorKind;
use a3s_attest_core::ReportRequest;
use a3s_attest_guest::tsm::{ConfigFs, ReportFs, ReportSession};
use a3s_attest_guest::SevReportClient;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Emulates the kernel side of configfs-tsm on top of a plain directory:
/// new entries get their read-only attributes, and writes bump `generation`.
struct KernelDir {
    inner: ConfigFs,
    provider: &'static str,
}

impl KernelDir {
    fn new(root: &Path, provider: &'static str) -> Self {
        Self {
            inner: ConfigFs::new(root).unwrap(),
            provider,
        }
    }

    fn bump_generation(entry: &Path) -> io::Result<()> {
        let current: u64 = fs::read_to_string(entry.join("generation"))?
            .trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(entry.join("generation"), format!("{}\n", current + 1))
    }
}

impl ReportFs for KernelDir {
    fn mkdir_temp(&self, dir: &Path, pattern: &str) -> io::Result<PathBuf> {
        let entry = self.inner.mkdir_temp(dir, pattern)?;
        fs::write(entry.join("generation"), "0\n")?;
        fs::write(entry.join("privlevel_floor"), "0\n")?;
        fs::write(entry.join("provider"), format!("{}\n", self.provider))?;
        fs::write(entry.join("outblob"), "")?;
        Ok(entry)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_all(path)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner.read_file(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.inner.write_file(path, contents)?;
        let entry = path.parent().unwrap_or(Path::new(""));
        if path.file_name().and_then(|n| n.to_str()) == Some("inblob") {
            let mut report = b"report:".to_vec();
            report.extend_from_slice(contents);
            fs::write(entry.join("outblob"), report)?;
        }
        Self::bump_generation(entry)
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).unwrap().next().is_none()
}

#[test]
fn test_report_over_directory_tree() {
    let root = tempfile::tempdir().unwrap();
    let kernel = KernelDir::new(root.path(), "sev_guest");

    let req = ReportRequest {
        in_blob: b"hello".to_vec(),
        ..Default::default()
    };
    let result = ReportSession::new(&kernel).get_report(&req).unwrap();
    assert_eq!(result.out_blob, b"report:hello");
    assert_eq!(result.provider, "sev_guest");
    assert!(is_empty_dir(root.path()));
}

#[test]
fn test_failed_session_leaves_no_entry() {
    // Without the kernel emulation there is no generation file to read.
    let root = tempfile::tempdir().unwrap();
    let gateway = ConfigFs::new(root.path()).unwrap();

    let req = ReportRequest {
        in_blob: b"hello".to_vec(),
        ..Default::default()
    };
    let err = ReportSession::new(&gateway).get_report(&req).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Session);
    assert!(is_empty_dir(root.path()));
}

#[test]
fn test_empty_outblob_leaves_no_entry() {
    let root = tempfile::tempdir().unwrap();
    let kernel = KernelDir::new(root.path(), "tdx_guest");

    // No inblob write, so the emulated kernel never produces a report.
    let err = ReportSession::new(&kernel)
        .get_report(&ReportRequest::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingValue);
    assert!(is_empty_dir(root.path()));
}

#[test]
fn test_missing_root_is_unsupported() {
    let root = tempfile::tempdir().unwrap();
    let err = SevReportClient::open(root.path().join("missing")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_concurrent_sessions_use_separate_entries() {
    let root = tempfile::tempdir().unwrap();
    let kernel = KernelDir::new(root.path(), "sev_guest");

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0u8..8)
            .map(|i| {
                let kernel = &kernel;
                scope.spawn(move || {
                    let req = ReportRequest {
                        in_blob: vec![i; 4],
                        ..Default::default()
                    };
                    ReportSession::new(kernel).get_report(&req)
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.join().unwrap().unwrap();
            let mut expected = b"report:".to_vec();
            expected.extend_from_slice(&[i as u8; 4]);
            assert_eq!(result.out_blob, expected);
        }
    });

    assert!(is_empty_dir(root.path()));
}

#[test]
fn test_sev_client_over_directory_tree() {
    let root = tempfile::tempdir().unwrap();
    let kernel = KernelDir::new(root.path(), "sev_guest");
    let result = SevReportClient::new(&kernel)
        .with_privilege(0)
        .get_report(&[0x42; 64])
        .unwrap();
    assert!(result.out_blob.starts_with(b"report:"));
    assert!(is_empty_dir(root.path()));
}

#[test]
fn test_relative_root_report_and_cleanup() {
    let root = tempfile::Builder::new().prefix("tsm").tempdir_in(".").unwrap();
    assert!(root.path().is_relative());
    let kernel = KernelDir::new(root.path(), "tdx_guest");

    let req = ReportRequest {
        in_blob: b"relative".to_vec(),
        ..Default::default()
    };
    let result = ReportSession::new(&kernel).get_report(&req).unwrap();
    assert_eq!(result.out_blob, b"report:relative");
    assert!(is_empty_dir(root.path()));
}
