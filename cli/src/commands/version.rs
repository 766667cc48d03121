//! `a3s-attest version` command.

use a3s_attest_core::AttestConfig;
use clap::Args;

#[derive(Args)]
pub struct VersionArgs;

pub fn execute(_args: VersionArgs, config: &AttestConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("a3s-attest version {}", a3s_attest_runtime::VERSION);
    println!("backend: {}", config.backend);
    println!(
        "nsm device: {} ({})",
        config.nsm_device.display(),
        if a3s_attest_runtime::is_nitro_enclave(&config.nsm_device) {
            "present"
        } else {
            "absent"
        }
    );
    Ok(())
}
