//! `a3s-attest attest` command: produce an attestation report.
//!
//! Binds the given user data into a report from the configured backend and
//! prints it base64-encoded, or as JSON with `--json`.

use a3s_attest_core::{AttestConfig, AttestOptions, Attester};
use a3s_attest_runtime::AttestBackend;
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::Args;
use std::path::PathBuf;

use super::hex_to_bytes;

#[derive(Args)]
pub struct AttestArgs {
    /// User data to bind (hex-encoded)
    #[arg(long, default_value = "")]
    pub user_data: String,

    /// Nonce (hex-encoded)
    #[arg(long, conflicts_with = "random_nonce")]
    pub nonce: Option<String>,

    /// Generate a random 32-byte nonce
    #[arg(long)]
    pub random_nonce: bool,

    /// Public key to bind (hex-encoded, Nitro only)
    #[arg(long)]
    pub public_key: Option<String>,

    /// Write the raw report to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Print a JSON object with backend, nonce and report
    #[arg(long)]
    pub json: bool,
}

/// JSON output for the attest command.
#[derive(serde::Serialize)]
struct AttestOutput {
    backend: String,
    /// Nonce used (hex-encoded)
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    /// Report (base64-encoded)
    report: String,
}

pub fn execute(args: AttestArgs, config: &AttestConfig) -> Result<(), Box<dyn std::error::Error>> {
    let user_data = hex_to_bytes(&args.user_data)?;

    let nonce = match (&args.nonce, args.random_nonce) {
        (Some(hex_nonce), _) => Some(hex_to_bytes(hex_nonce)?),
        (None, true) => Some(generate_random_nonce()),
        (None, false) => None,
    };

    let mut opts = AttestOptions::new();
    if let Some(ref nonce) = nonce {
        opts = opts.with_nonce(nonce.clone());
    }
    if let Some(ref key) = args.public_key {
        opts = opts.with_public_key(hex_to_bytes(key)?);
    }

    let attester = AttestBackend::from_config(config)?;
    let report = attester.attest(&user_data, &opts)?;

    if let Some(path) = &args.output {
        std::fs::write(path, &report)
            .map_err(|e| format!("Failed to write report to {}: {}", path.display(), e))?;
        tracing::info!(path = %path.display(), len = report.len(), "Report written");
        return Ok(());
    }

    if args.json {
        let output = AttestOutput {
            backend: attester.backend().to_string(),
            nonce: nonce.as_deref().map(hex::encode),
            report: STANDARD.encode(&report),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", STANDARD.encode(&report));
    }
    Ok(())
}

/// Generate a random 32-byte nonce.
fn generate_random_nonce() -> Vec<u8> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut nonce = vec![0u8; 32];
    rng.fill(&mut nonce[..]);
    nonce
}
