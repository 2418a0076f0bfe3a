// Latch Trusted Extension Loader
// Main entry point for the latch binary

use clap::Parser;
use latch_engine::cli::{Cli, Command};
use latch_engine::config::Config;
use latch_engine::handlers::{
    handle_fingerprint, handle_inspect, handle_install, handle_status, OutputFormat,
};
use latch_engine::telemetry::init_telemetry_with_level;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log overrides the config; RUST_LOG overrides both
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Latch v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Install => {
            tracing::debug!("Installing extension '{}'", config.extension.package);
            handle_install(&config, format)
        }

        Command::Status => handle_status(&config, format),

        Command::Inspect { package } => {
            tracing::debug!("Inspecting package: {:?}", package);
            handle_inspect(&config, package, format)
        }

        Command::Fingerprint { cert } => handle_fingerprint(&cert, format),
    }
}
