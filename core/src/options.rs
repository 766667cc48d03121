//! Uniform option set shared by every attestation backend.
//!
//! Both records start from documented defaults and are adjusted with
//! `with_*` mutators applied in call order:
//!
//! - [`AttestOptions`]: no nonce, no public key.
//! - [`VerifyOptions`]: empty measurement, no nonce, `debug = false`, and a
//!   verification time of "now" resolved when `verify` runs.

use chrono::{DateTime, Utc};

/// Options for producing a report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestOptions {
    /// Freshness value to bind into the report.
    pub nonce: Option<Vec<u8>>,
    /// Public key to bind into the report (device path only).
    pub public_key: Option<Vec<u8>>,
}

impl AttestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nonce(mut self, nonce: impl Into<Vec<u8>>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_public_key(mut self, public_key: impl Into<Vec<u8>>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }
}

/// Options for verifying a report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Expected measurement. Empty means "do not check".
    pub measurement: String,
    /// Accept reports produced in debug mode.
    pub debug: bool,
    /// Verification time. `None` means the current time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Expected nonce.
    pub nonce: Option<Vec<u8>>,
}

impl VerifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = measurement.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<Vec<u8>>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// The time the report is checked against.
    pub fn verification_time(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }
}
