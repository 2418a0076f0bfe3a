//! CLI interface for Latch
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Latch trusted extension loader
///
/// Verifies and loads the optional TLS provider extension on platforms that
/// lack modern TLS, and reports what it decided.
#[derive(Parser, Debug)]
#[command(name = "latch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify and install the extension if the platform needs it
    Install,

    /// Install if needed, then show whether the user would be prompted
    Status,

    /// Show presence, fingerprint and trust verdict of packages without loading them
    Inspect {
        /// Package to inspect (defaults to every installed package)
        package: Option<String>,
    },

    /// Compute the signature fingerprint of a DER certificate file
    Fingerprint {
        /// Path to the certificate
        cert: PathBuf,
    },
}
