use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AttestError, Result};
use crate::tee::Backend;

/// Environment variable selecting the backend.
pub const BACKEND_ENV: &str = "A3S_ATTEST_BACKEND";

/// Environment variable overriding the configfs-tsm report root.
pub const TSM_ROOT_ENV: &str = "A3S_ATTEST_TSM_ROOT";

/// Environment variable overriding the NSM device path.
pub const NSM_DEVICE_ENV: &str = "A3S_ATTEST_NSM_DEVICE";

/// Default configfs-tsm report root.
pub const DEFAULT_TSM_ROOT: &str = "/sys/kernel/config/tsm/report";

/// Default NSM device path.
pub const DEFAULT_NSM_DEVICE: &str = "/dev/nsm";

/// Default user data ceiling for the software backend.
pub const DEFAULT_MAX_USER_DATA: usize = 1024;

/// Default report validity period (one year).
pub const DEFAULT_VALIDITY_SECS: u64 = 365 * 24 * 60 * 60;

/// Attestation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestConfig {
    /// Backend producing and checking reports
    pub backend: Backend,

    /// configfs-tsm report directory
    pub tsm_root: PathBuf,

    /// NSM character device
    pub nsm_device: PathBuf,

    /// Maximum user data accepted by the software backend
    pub max_user_data: usize,

    /// How long a software report stays valid, in seconds
    pub validity_secs: u64,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for AttestConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Software,
            tsm_root: PathBuf::from(DEFAULT_TSM_ROOT),
            nsm_device: PathBuf::from(DEFAULT_NSM_DEVICE),
            max_user_data: DEFAULT_MAX_USER_DATA,
            validity_secs: DEFAULT_VALIDITY_SECS,
            log_level: LogLevel::Warn,
        }
    }
}

impl AttestConfig {
    /// Load configuration from a JSON file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AttestError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: AttestConfig = serde_json::from_str(&content).map_err(|e| {
            AttestError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.with_env_overrides()
    }

    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(backend) = std::env::var(BACKEND_ENV) {
            self.backend = backend.parse().map_err(AttestError::Config)?;
        }
        if let Ok(root) = std::env::var(TSM_ROOT_ENV) {
            self.tsm_root = PathBuf::from(root);
        }
        if let Ok(device) = std::env::var(NSM_DEVICE_ENV) {
            self.nsm_device = PathBuf::from(device);
        }
        tracing::debug!(backend = %self.backend, "Loaded attestation config");
        Ok(self)
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
