//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - install: Run the trusted install sequence once
//! - status: Install if needed, then report prompt state
//! - inspect: Report signatures and trust verdicts without loading anything
//! - fingerprint: Compute a certificate fingerprint

use anyhow::{Context, Result};
use latch_sdk::errors::{LatchErrorExt, LoaderError};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::crypto::Fingerprint;
use crate::installer::{ExtensionInstaller, HostContext, InstallOutcome, LoadState};
use crate::platform::{ConfiguredPlatform, PlatformInfo, NATIVE_TLS_CAPABILITY_LEVEL};
use crate::prompt::{add_install_prompt_if_needed, InstallPrompt, PromptEntry};
use crate::registry::{FilesystemRegistry, PackageRegistry};
use crate::trust::{self, TrustSource};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn outcome_json(outcome: &InstallOutcome) -> serde_json::Value {
    match outcome {
        InstallOutcome::NativelySupported => json!({ "result": "natively_supported" }),
        InstallOutcome::AlreadyInstalled => json!({ "result": "already_installed" }),
        InstallOutcome::Installed(trust) => json!({ "result": "installed", "trust": trust }),
        InstallOutcome::Skipped(e) => json!({
            "result": "skipped",
            "kind": format!("{:?}", e.kind()),
            "error": e.to_string(),
            "hint": e.user_hint(),
            "recoverable": e.is_recoverable(),
        }),
    }
}

/// Run the install sequence once
pub fn handle_install(config: &Config, format: OutputFormat) -> Result<()> {
    let state = Arc::new(LoadState::new());
    let installer = ExtensionInstaller::from_config(config, state);
    let host = HostContext::from_config(config);

    let outcome = installer.install_if_needed(&host);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
        }
        OutputFormat::Text => {
            println!("{}: {}", installer.package(), outcome);
            if let InstallOutcome::Skipped(e) = &outcome {
                println!("Hint: {}", e.user_hint());
            }
        }
    }

    Ok(())
}

/// Install if needed, then report whether the user would be prompted
pub fn handle_status(config: &Config, format: OutputFormat) -> Result<()> {
    let state = Arc::new(LoadState::new());
    let installer = ExtensionInstaller::from_config(config, Arc::clone(&state));
    let host = HostContext::from_config(config);
    let platform = ConfiguredPlatform::from_config(config);

    let outcome = installer.install_if_needed(&host);

    let mut entries: Vec<PromptEntry> = Vec::new();
    add_install_prompt_if_needed(
        &installer,
        &InstallPrompt::from_config(config),
        &mut entries,
    );

    match format {
        OutputFormat::Json => {
            let output = json!({
                "extension": installer.package(),
                "capability_level": platform.capability_level(),
                "native_threshold": NATIVE_TLS_CAPABILITY_LEVEL,
                "native_tls": platform.provides_native_tls(),
                "outcome": outcome_json(&outcome),
                "installed": state.installed(),
                "should_prompt": installer.should_prompt_installation(),
                "prompt": entries,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("Extension:        {}", installer.package());
            println!(
                "Capability level: {} (native TLS from {})",
                platform.capability_level(),
                NATIVE_TLS_CAPABILITY_LEVEL
            );
            println!("Outcome:          {}", outcome);

            if let Some(installed) = state.installed() {
                println!(
                    "Installed:        {} v{} ({})",
                    installed.name, installed.version, installed.trust
                );
            }

            if entries.is_empty() {
                println!("Prompt:           none");
            } else {
                for entry in &entries {
                    println!("Prompt:           {}", entry.title);
                    println!("                  {}", entry.summary);
                    println!("                  {}", entry.link);
                }
            }
        }
    }

    Ok(())
}

/// Presence, signature and trust verdict of one package
#[derive(Debug)]
pub struct PackageReport {
    pub package: String,
    pub installed: bool,
    pub version: Option<String>,
    pub fingerprint: Option<Result<Fingerprint, LoaderError>>,
    pub verdict: Option<Result<TrustSource, LoaderError>>,
}

impl PackageReport {
    fn to_json(&self) -> serde_json::Value {
        json!({
            "package": self.package,
            "installed": self.installed,
            "version": self.version,
            "fingerprint": self.fingerprint.as_ref().map(|r| match r {
                Ok(fp) => json!(fp),
                Err(e) => json!({ "error": e.to_string() }),
            }),
            "trust": self.verdict.as_ref().map(|r| match r {
                Ok(source) => json!({ "trusted": true, "source": source }),
                Err(e) => json!({ "trusted": false, "error": e.to_string() }),
            }),
        })
    }

    fn print_text(&self) {
        println!("Package:     {}", self.package);
        if !self.installed {
            println!("Installed:   no");
            return;
        }

        println!("Installed:   yes");
        if let Some(version) = &self.version {
            println!("Version:     {}", version);
        }
        match &self.fingerprint {
            Some(Ok(fp)) => println!("Fingerprint: {}", fp),
            Some(Err(e)) => println!("Fingerprint: unavailable ({})", e),
            None => {}
        }
        match &self.verdict {
            Some(Ok(source)) => println!("Trusted:     yes ({})", source),
            Some(Err(e)) => println!("Trusted:     no ({})", e),
            None => {}
        }
    }
}

/// Inspect one package, or every installed package when none is named
///
/// Never loads any code.
pub fn inspect_packages(config: &Config, package: Option<String>) -> Result<Vec<PackageReport>> {
    let registry = FilesystemRegistry::new(config.registry.root.clone());

    let packages = match package {
        Some(package) => vec![package],
        None => registry.list().with_context(|| {
            format!(
                "Failed to list packages in {}",
                registry.root().display()
            )
        })?,
    };

    let reports = packages
        .into_iter()
        .map(|package| {
            let installed = registry.is_installed(&package);
            if !installed {
                return PackageReport {
                    package,
                    installed,
                    version: None,
                    fingerprint: None,
                    verdict: None,
                };
            }

            PackageReport {
                version: registry.manifest(&package).ok().map(|m| m.version),
                fingerprint: Some(registry.signature_fingerprint(&package)),
                verdict: Some(trust::verify_candidate(
                    &registry,
                    &config.host.package,
                    &package,
                )),
                package,
                installed,
            }
        })
        .collect();

    Ok(reports)
}

/// Report presence, fingerprint and trust verdict without loading anything
pub fn handle_inspect(
    config: &Config,
    package: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let reports = inspect_packages(config, package)?;

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = reports.iter().map(|r| r.to_json()).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            if reports.is_empty() {
                println!(
                    "No packages installed in {}",
                    config.registry.root.display()
                );
            }
            for (i, report) in reports.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                report.print_text();
            }
        }
    }

    Ok(())
}

/// Compute the fingerprint of a DER certificate file
pub fn handle_fingerprint(cert: &Path, format: OutputFormat) -> Result<()> {
    let der = std::fs::read(cert)
        .with_context(|| format!("Failed to read certificate {}", cert.display()))?;
    let fingerprint = Fingerprint::of_certificate(&der);
    let anchor = trust::match_anchor(&fingerprint);

    match format {
        OutputFormat::Json => {
            let output = json!({
                "fingerprint": fingerprint,
                "channel": anchor.map(|a| a.channel),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("{}", fingerprint);
            if let Some(anchor) = anchor {
                println!("Matches the {} release channel", anchor.channel);
            }
        }
    }

    Ok(())
}
