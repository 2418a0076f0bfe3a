//! Trusted extension installer
//!
//! The installer decides, once per process, whether the optional capability
//! extension gets to run code in the host:
//!
//! 1. Skip if the platform already provides the capability natively
//! 2. Skip if an extension was already installed
//! 3. Skip if the extension package is not present
//! 4. Reject unless the two-stage trust check passes
//! 5. Bind the entry point and invoke it
//!
//! `install_if_needed` is best-effort: every failure is logged and reported in
//! the returned [`InstallOutcome`], never propagated, and the host keeps running
//! without the capability.
//!
//! # Examples
//!
//! ```no_run
//! use latch_engine::config::Config;
//! use latch_engine::installer::{ExtensionInstaller, HostContext, LoadState};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! let state = Arc::new(LoadState::new());
//! let installer = ExtensionInstaller::from_config(&config, state);
//! let host = HostContext::from_config(&config);
//!
//! installer.install_if_needed(&host);
//! if installer.should_prompt_installation() {
//!     println!("TLS provider unavailable");
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::platform::{ConfiguredPlatform, PlatformInfo};
use crate::registry::{FilesystemRegistry, PackageRegistry};
use crate::runtime::{DynamicLoader, EntryPoint, Invocable, NativeLoader};
use crate::trust::{self, TrustSource};
use chrono::{DateTime, Utc};
use latch_sdk::errors::{FailureKind, LoaderError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// The host's view of the system: who it is, what is installed, how to bind
#[derive(Clone)]
pub struct HostContext {
    /// Package name of the host itself
    pub package: String,
    pub registry: Arc<dyn PackageRegistry>,
    pub loader: Arc<dyn DynamicLoader>,
}

impl HostContext {
    pub fn new(
        package: impl Into<String>,
        registry: Arc<dyn PackageRegistry>,
        loader: Arc<dyn DynamicLoader>,
    ) -> Self {
        Self {
            package: package.into(),
            registry,
            loader,
        }
    }

    /// Filesystem registry and native loader rooted at `[registry] root`
    pub fn from_config(config: &Config) -> Self {
        let registry = FilesystemRegistry::new(config.registry.root.clone());
        let loader = NativeLoader::new(registry.clone());
        Self::new(config.host.package.clone(), Arc::new(registry), Arc::new(loader))
    }
}

/// Metadata of the installed extension
#[derive(Debug, Clone, Serialize)]
pub struct InstalledExtension {
    pub package: String,
    pub name: String,
    pub version: String,
    pub trust: TrustSource,
    pub installed_at: DateTime<Utc>,
}

struct Loaded {
    info: InstalledExtension,
    // Keeps the extension's code mapped for the rest of the process
    _handle: Box<dyn Invocable>,
}

/// Process-wide load state, owned by the composition root
///
/// Transitions from not installed to installed exactly once and is never
/// reset.
#[derive(Default)]
pub struct LoadState {
    installed: AtomicBool,
    slot: Mutex<Option<Loaded>>,
}

impl LoadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Metadata of the installed extension, if any
    pub fn installed(&self) -> Option<InstalledExtension> {
        self.lock().as_ref().map(|loaded| loaded.info.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Loaded>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Result of an install attempt
#[derive(Debug)]
pub enum InstallOutcome {
    /// The platform provides the capability; nothing was queried
    NativelySupported,
    /// An extension was installed earlier in this process
    AlreadyInstalled,
    /// The extension was verified and its entry point invoked
    Installed(TrustSource),
    /// The extension was not installed; the host continues without it
    Skipped(LoaderError),
}

impl InstallOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed(_) | Self::AlreadyInstalled)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Skipped(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl std::fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NativelySupported => f.write_str("platform provides the capability natively"),
            Self::AlreadyInstalled => f.write_str("already installed"),
            Self::Installed(trust) => write!(f, "installed (trusted: {})", trust),
            Self::Skipped(e) => write!(f, "not installed: {}", e),
        }
    }
}

/// Trusted extension installer
pub struct ExtensionInstaller {
    package: String,
    entry: EntryPoint,
    platform: Arc<dyn PlatformInfo>,
    state: Arc<LoadState>,
}

impl ExtensionInstaller {
    pub fn new(
        package: impl Into<String>,
        entry: EntryPoint,
        platform: Arc<dyn PlatformInfo>,
        state: Arc<LoadState>,
    ) -> Self {
        Self {
            package: package.into(),
            entry,
            platform,
            state,
        }
    }

    pub fn from_config(config: &Config, state: Arc<LoadState>) -> Self {
        Self::new(
            config.extension.package.clone(),
            EntryPoint::new(config.extension.entry_symbol.clone()),
            Arc::new(ConfiguredPlatform::from_config(config)),
            state,
        )
    }

    /// Package name of the extension candidate
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Whether the user should be offered the extension
    ///
    /// Always false when the platform provides the capability natively.
    pub fn should_prompt_installation(&self) -> bool {
        if self.platform.provides_native_tls() {
            return false;
        }

        !self.state.is_installed()
    }

    /// Install the extension if the platform needs it and it can be trusted
    ///
    /// Never fails and never panics on extension errors. Concurrent callers
    /// are serialised, so the entry point is invoked at most once.
    pub fn install_if_needed(&self, host: &HostContext) -> InstallOutcome {
        if self.platform.provides_native_tls() {
            tracing::debug!(
                "Platform capability level {} provides TLS natively, skipping '{}'",
                self.platform.capability_level(),
                self.package
            );
            return InstallOutcome::NativelySupported;
        }

        let mut slot = self.state.lock();
        if slot.is_some() {
            return InstallOutcome::AlreadyInstalled;
        }

        match self.try_install(host) {
            Ok(loaded) => {
                let trust = loaded.info.trust;
                tracing::info!(
                    "Extension '{}' v{} installed ({})",
                    loaded.info.package,
                    loaded.info.version,
                    trust
                );
                *slot = Some(loaded);
                self.state.installed.store(true, Ordering::Release);
                InstallOutcome::Installed(trust)
            }
            Err(e) => {
                self.log_failure(&e);
                InstallOutcome::Skipped(e)
            }
        }
    }

    fn try_install(&self, host: &HostContext) -> Result<Loaded, LoaderError> {
        if !host.registry.is_installed(&self.package) {
            return Err(LoaderError::NotPresent(self.package.clone()));
        }

        let trust = trust::verify_candidate(host.registry.as_ref(), &host.package, &self.package)?;

        let handle = host.loader.load_entry_point(&self.package, &self.entry)?;
        handle.invoke()?;

        let info = InstalledExtension {
            package: self.package.clone(),
            name: handle.name().to_string(),
            version: handle.version().to_string(),
            trust,
            installed_at: Utc::now(),
        };

        Ok(Loaded {
            info,
            _handle: handle,
        })
    }

    fn log_failure(&self, error: &LoaderError) {
        match error.kind() {
            FailureKind::NotPresent => {
                tracing::debug!("Extension '{}' is not installed", self.package);
            }
            FailureKind::UntrustedSignature => {
                tracing::error!(
                    "Extension '{}' found, but with an invalid signature. Ignoring.",
                    self.package
                );
            }
            FailureKind::SignatureQueryFailed => {
                tracing::error!(
                    "Could not verify the signature of extension '{}', ignoring it: {}",
                    self.package,
                    error
                );
            }
            FailureKind::LoadFailure | FailureKind::Other => {
                tracing::error!("Could not install extension '{}': {}", self.package, error);
            }
        }
    }
}
