//! `a3s-attest verify` command: check a report and print its user data.
//!
//! Only software reports can be verified here. Hardware documents need a
//! vendor certificate-chain verifier, which the library accepts but this
//! binary does not ship.

use a3s_attest_core::{AttestConfig, Verifier, VerifyOptions};
use a3s_attest_runtime::VerifyBackend;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::Path;

use super::hex_to_bytes;

#[derive(Args)]
pub struct VerifyArgs {
    /// Report as base64, or a path to a file holding it (raw or base64)
    #[arg(long)]
    pub report: String,

    /// Expected measurement
    #[arg(long, default_value = "")]
    pub measurement: String,

    /// Expected nonce (hex-encoded)
    #[arg(long)]
    pub nonce: Option<String>,

    /// Accept reports produced in debug mode
    #[arg(long)]
    pub debug: bool,

    /// Verification time (RFC 3339); defaults to now
    #[arg(long)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Print a JSON object instead of the hex user data
    #[arg(long)]
    pub json: bool,
}

/// JSON output for the verify command.
#[derive(serde::Serialize)]
struct VerifyOutput {
    backend: String,
    verified: bool,
    /// User data (hex-encoded)
    user_data: String,
}

/// Load the report from a file or decode it from the argument.
fn read_report(value: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let path = Path::new(value);
    if path.is_file() {
        let raw = std::fs::read(path)
            .map_err(|e| format!("Failed to read report {}: {}", path.display(), e))?;
        let decoded = STANDARD.decode(String::from_utf8_lossy(&raw).trim());
        return Ok(decoded.unwrap_or(raw));
    }
    STANDARD
        .decode(value.trim())
        .map_err(|e| format!("Report is neither a file nor base64: {}", e).into())
}

pub fn execute(args: VerifyArgs, config: &AttestConfig) -> Result<(), Box<dyn std::error::Error>> {
    let report = read_report(&args.report)?;

    let mut opts = VerifyOptions::new()
        .with_measurement(args.measurement)
        .with_debug(args.debug);
    if let Some(ts) = args.timestamp {
        opts = opts.with_timestamp(ts);
    }
    if let Some(ref nonce) = args.nonce {
        opts = opts.with_nonce(hex_to_bytes(nonce)?);
    }

    let verifier = VerifyBackend::from_config(config, None)?;
    let user_data = verifier.verify(&report, &opts)?;

    if args.json {
        let output = VerifyOutput {
            backend: verifier.backend().to_string(),
            verified: true,
            user_data: hex::encode(&user_data),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", hex::encode(&user_data));
    }
    Ok(())
}
