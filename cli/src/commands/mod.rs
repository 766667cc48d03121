//! CLI command definitions and dispatch.

mod attest;
mod verify;
mod version;

use std::path::PathBuf;

use a3s_attest_core::{AttestConfig, Backend};
use clap::{Parser, Subcommand};

/// A3S Attest: produce and verify TEE attestation reports.
#[derive(Parser)]
#[command(name = "a3s-attest", version, about)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend to use (software, nitro, sev-snp, tdx); overrides the configuration
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Produce an attestation report binding user data
    Attest(attest::AttestArgs),
    /// Verify a report and print the bound user data
    Verify(verify::VerifyArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Resolve the configuration: file (or defaults), environment, then flags.
pub fn load_config(cli: &Cli) -> Result<AttestConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AttestConfig::load(path)?,
        None => AttestConfig::from_env()?,
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    Ok(config)
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub fn dispatch(cli: Cli, config: AttestConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Attest(args) => attest::execute(args, &config),
        Command::Verify(args) => verify::execute(args, &config),
        Command::Version(args) => version::execute(args, &config),
    }
}

/// Decode a hex string to bytes. A `0x` prefix is accepted.
pub(crate) fn hex_to_bytes(value: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let value = value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(value).map_err(|e| format!("Invalid hex '{}': {}", value, e).into())
}
