//! A3S Attest CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use a3s_attest_cli::commands::{dispatch, load_config, Cli};

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing; RUST_LOG wins over the configured level
    let default_level = tracing::Level::from(config.log_level).to_string().to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dispatch(cli, config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
