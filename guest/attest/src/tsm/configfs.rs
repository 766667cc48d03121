//! Scoped filesystem access to the configfs-tsm report root.
//!
//! Only the narrow surface the report protocol needs is exposed. All paths
//! are resolved against the configured root; absolute paths outside it are
//! rejected.

use a3s_attest_core::error::{AttestError, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Attempts before `mkdir_temp` gives up on name collisions.
const MKDIR_TEMP_ATTEMPTS: usize = 16;

/// Filesystem operations used by a report session.
pub trait ReportFs {
    /// Create a uniquely named directory under `dir`. The last `*` in
    /// `pattern` is replaced by a random string; without one, the random
    /// string is appended.
    fn mkdir_temp(&self, dir: &Path, pattern: &str) -> io::Result<PathBuf>;

    /// Remove `path` and anything below it. Missing paths are not an error.
    fn remove_all(&self, path: &Path) -> io::Result<()>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `contents`, creating the file owner-write-only. Reading it back
    /// through this gateway is not guaranteed to work.
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

impl<T: ReportFs + ?Sized> ReportFs for &T {
    fn mkdir_temp(&self, dir: &Path, pattern: &str) -> io::Result<PathBuf> {
        (**self).mkdir_temp(dir, pattern)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        (**self).remove_all(path)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        (**self).write_file(path, contents)
    }
}

/// Gateway over a real configfs (or any directory standing in for it).
#[derive(Debug, Clone)]
pub struct ConfigFs {
    root: PathBuf,
}

impl ConfigFs {
    /// Validate that `root` exists and is a directory. The root is stored
    /// canonicalized, so every path handed out by `mkdir_temp` is absolute.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let meta = fs::metadata(&root).map_err(|e| {
            AttestError::Unsupported(format!(
                "configfs-tsm root {} unavailable: {} (is TSM_REPORTS enabled?)",
                root.display(),
                e
            ))
        })?;
        if !meta.is_dir() {
            return Err(AttestError::Unsupported(format!(
                "configfs-tsm root {} is not a directory",
                root.display()
            )));
        }
        let root = fs::canonicalize(&root).map_err(|e| {
            AttestError::Unsupported(format!(
                "configfs-tsm root {} cannot be resolved: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        if path.is_absolute() {
            if path.starts_with(&self.root) && !has_parent_component(path) {
                return Ok(path.to_path_buf());
            }
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is outside {}", path.display(), self.root.display()),
            ));
        }
        if has_parent_component(path) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} escapes {}", path.display(), self.root.display()),
            ));
        }
        if path.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(path))
    }
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Expand a `mkdir_temp` pattern with a random suffix.
pub(crate) fn temp_name(pattern: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    let random = &random[..16];
    match pattern.rfind('*') {
        Some(pos) => format!("{}{}{}", &pattern[..pos], random, &pattern[pos + 1..]),
        None => format!("{}{}", pattern, random),
    }
}

impl ReportFs for ConfigFs {
    fn mkdir_temp(&self, dir: &Path, pattern: &str) -> io::Result<PathBuf> {
        let parent = self.resolve(dir)?;
        for _ in 0..MKDIR_TEMP_ATTEMPTS {
            let candidate = parent.join(temp_name(pattern));
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no unique name for {} in {}", pattern, parent.display()),
        ))
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let path = self.resolve(path)?;
        // configfs entries are removed with rmdir even though they list
        // attribute files, so try that before walking the tree.
        match fs::remove_dir(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(_) => {
                let meta = fs::symlink_metadata(&path)?;
                if meta.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                }
            }
        }
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let path = self.resolve(path)?;
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o200);
        }
        let mut file = options.open(&path)?;
        file.write_all(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_missing_root() {
        let err = ConfigFs::new("/nonexistent/tsm/report").unwrap_err();
        assert!(matches!(err, AttestError::Unsupported(_)));
    }

    #[test]
    fn test_new_root_is_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = ConfigFs::new(file.path()).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_temp_name_pattern() {
        let name = temp_name("entry*");
        assert!(name.starts_with("entry"));
        assert_eq!(name.len(), "entry".len() + 16);

        let name = temp_name("a*b*c");
        assert!(name.starts_with("a*b"));
        assert!(name.ends_with('c'));

        let name = temp_name("plain");
        assert!(name.starts_with("plain"));
        assert_eq!(name.len(), "plain".len() + 16);
    }

    #[test]
    fn test_mkdir_temp_unique() {
        let dir = tempfile::tempdir().unwrap();
        let gw = ConfigFs::new(dir.path()).unwrap();
        let a = gw.mkdir_temp(Path::new(""), "entry*").unwrap();
        let b = gw.mkdir_temp(Path::new(""), "entry*").unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir());
        assert!(b.is_dir());
        assert_eq!(a.parent().unwrap(), gw.root());
    }

    #[test]
    fn test_mkdir_temp_relative_subdir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let gw = ConfigFs::new(dir.path()).unwrap();
        let entry = gw.mkdir_temp(Path::new("sub"), "x-*").unwrap();
        assert_eq!(entry.parent().unwrap(), gw.root().join("sub"));
    }

    #[test]
    fn test_write_file_owner_write_only() {
        let dir = tempfile::tempdir().unwrap();
        let gw = ConfigFs::new(dir.path()).unwrap();
        gw.write_file(Path::new("inblob"), b"hello").unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dir.path().join("inblob"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o200);
        }
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("generation"), b"3\n").unwrap();
        let gw = ConfigFs::new(dir.path()).unwrap();
        assert_eq!(gw.read_file(Path::new("generation")).unwrap(), b"3\n");
        let absolute = gw.root().join("generation");
        assert_eq!(gw.read_file(&absolute).unwrap(), b"3\n");
    }

    #[test]
    fn test_remove_all_tree_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let gw = ConfigFs::new(dir.path()).unwrap();
        let entry = gw.mkdir_temp(Path::new(""), "entry*").unwrap();
        fs::write(entry.join("outblob"), b"report").unwrap();
        gw.remove_all(&entry).unwrap();
        assert!(!entry.exists());
        gw.remove_all(&entry).unwrap();
    }

    #[test]
    fn test_paths_outside_root_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gw = ConfigFs::new(dir.path()).unwrap();
        let err = gw.read_file(Path::new("/etc/hostname")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let err = gw.write_file(Path::new("../escape"), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_relative_root_session_paths() {
        let dir = tempfile::Builder::new().prefix("tsm").tempdir_in(".").unwrap();
        assert!(dir.path().is_relative());
        let gw = ConfigFs::new(dir.path()).unwrap();
        assert!(gw.root().is_absolute());

        let entry = gw.mkdir_temp(Path::new(""), "entry*").unwrap();
        assert!(entry.is_absolute());
        gw.write_file(&entry.join("inblob"), b"data").unwrap();
        fs::write(entry.join("generation"), b"1\n").unwrap();
        assert_eq!(gw.read_file(&entry.join("generation")).unwrap(), b"1\n");

        gw.remove_all(&entry).unwrap();
        assert!(!entry.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
