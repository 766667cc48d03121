//! In-memory stand-in for the kernel's configfs-tsm report interface.
//!
//! Mirrors the behaviour report sessions depend on: every attribute write
//! bumps the entry's generation, `outblob` is derived from `inblob`, and
//! `provider` names the backend. Hooks inject the failure modes that are
//! hard to provoke against a real kernel.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::configfs::{temp_name, ReportFs};
use super::session::{
    ATTR_AUXBLOB, ATTR_GENERATION, ATTR_INBLOB, ATTR_MANIFESTBLOB, ATTR_OUTBLOB, ATTR_PROVIDER,
    ATTR_PRIVLEVEL_FLOOR,
};

const FAKE_ROOT: &str = "/fake/config/tsm/report";

#[derive(Debug, Default)]
struct Entry {
    generation: u64,
    in_blob: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    provider: String,
    privlevel_floor: u32,
    entries: HashMap<PathBuf, Entry>,
    created: usize,
    written: Vec<(String, Vec<u8>)>,
    interfere_after_write: Option<String>,
    interfere_on_read: Option<String>,
    fail_write: Option<String>,
    fail_mkdir: bool,
    empty_outblob: bool,
}

/// Fake report root. Shareable across threads like the real filesystem.
#[derive(Debug)]
pub struct FakeTsm {
    state: Mutex<State>,
}

impl FakeTsm {
    pub const AUX_BLOB: [u8; 4] = *b"cert";
    pub const MANIFEST_BLOB: [u8; 8] = *b"manifest";

    /// A root whose reports claim to come from `provider`. An empty provider
    /// makes the `provider` attribute read back empty.
    pub fn new(provider: &str) -> Self {
        Self {
            state: Mutex::new(State {
                provider: provider.to_string(),
                ..Default::default()
            }),
        }
    }

    /// The report the fake produces for `in_blob`.
    pub fn report_for(in_blob: &[u8]) -> Vec<u8> {
        let mut report = b"report:".to_vec();
        report.extend_from_slice(in_blob);
        report
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_privlevel_floor(&self, floor: u32) {
        self.lock().privlevel_floor = floor;
    }

    /// Simulate another writer touching the entry right after `attr` is written.
    pub fn interfere_after_write(&self, attr: &str) {
        self.lock().interfere_after_write = Some(attr.to_string());
    }

    /// Simulate another writer touching the entry while `attr` is read.
    pub fn interfere_on_read(&self, attr: &str) {
        self.lock().interfere_on_read = Some(attr.to_string());
    }

    /// Make writes to `attr` fail with `PermissionDenied`.
    pub fn fail_write(&self, attr: &str) {
        self.lock().fail_write = Some(attr.to_string());
    }

    pub fn fail_mkdir(&self) {
        self.lock().fail_mkdir = true;
    }

    pub fn set_empty_outblob(&self) {
        self.lock().empty_outblob = true;
    }

    /// Entries created and not yet removed.
    pub fn live_entries(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn entries_created(&self) -> usize {
        self.lock().created
    }

    /// Every successful attribute write, in order.
    pub fn written(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().written.clone()
    }
}

fn split(path: &Path) -> io::Result<(PathBuf, String)> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => Ok((parent.to_path_buf(), name.to_string_lossy().into_owned())),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not an entry attribute", path.display()),
        )),
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{}", path.display()))
}

impl ReportFs for FakeTsm {
    fn mkdir_temp(&self, dir: &Path, pattern: &str) -> io::Result<PathBuf> {
        let mut state = self.lock();
        if state.fail_mkdir {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "mkdir denied",
            ));
        }
        let path = Path::new(FAKE_ROOT).join(dir).join(temp_name(pattern));
        state.entries.insert(path.clone(), Entry::default());
        state.created += 1;
        Ok(path)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        self.lock().entries.remove(path);
        Ok(())
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let (entry_path, attr) = split(path)?;
        let mut state = self.lock();
        let interfere = state.interfere_on_read.as_deref() == Some(attr.as_str());
        let provider = state.provider.clone();
        let floor = state.privlevel_floor;
        let empty_outblob = state.empty_outblob;

        let entry = state
            .entries
            .get_mut(&entry_path)
            .ok_or_else(|| not_found(path))?;

        let value = match attr.as_str() {
            ATTR_GENERATION => format!("{}\n", entry.generation).into_bytes(),
            ATTR_OUTBLOB if empty_outblob => Vec::new(),
            ATTR_OUTBLOB => Self::report_for(&entry.in_blob),
            ATTR_PROVIDER if provider.is_empty() => Vec::new(),
            ATTR_PROVIDER => format!("{}\n", provider).into_bytes(),
            ATTR_AUXBLOB => Self::AUX_BLOB.to_vec(),
            ATTR_MANIFESTBLOB => Self::MANIFEST_BLOB.to_vec(),
            ATTR_PRIVLEVEL_FLOOR => format!("{}\n", floor).into_bytes(),
            _ => return Err(not_found(path)),
        };

        if interfere {
            entry.generation += 1;
        }
        Ok(value)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let (entry_path, attr) = split(path)?;
        let mut state = self.lock();
        if state.fail_write.as_deref() == Some(attr.as_str()) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("write to {} denied", attr),
            ));
        }
        let interfere = state.interfere_after_write.as_deref() == Some(attr.as_str());

        let entry = state
            .entries
            .get_mut(&entry_path)
            .ok_or_else(|| not_found(path))?;
        if attr == ATTR_INBLOB {
            entry.in_blob = contents.to_vec();
        }
        entry.generation += 1;
        if interfere {
            entry.generation += 1;
        }

        state.written.push((attr, contents.to_vec()));
        Ok(())
    }
}
