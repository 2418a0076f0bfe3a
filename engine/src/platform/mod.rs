//! Platform capability and platform-specific utilities
//!
//! This module answers two questions for the loader:
//!
//! - Does the host platform already provide the capability natively? Platforms
//!   report an integer capability level; at or above
//!   [`NATIVE_TLS_CAPABILITY_LEVEL`] modern TLS is built in and no extension is
//!   needed.
//! - What is the platform-specific file name of an extension's shared library?

use crate::config::Config;

/// First capability level at which the platform ships TLS 1.3 natively
///
/// Matches API level 29, the first Android release with TLS 1.3 enabled by
/// default.
pub const NATIVE_TLS_CAPABILITY_LEVEL: u32 = 29;

/// Source of the host platform's capability level
pub trait PlatformInfo: Send + Sync {
    /// Capability level of the running platform
    fn capability_level(&self) -> u32;

    /// Whether the platform natively provides modern TLS
    fn provides_native_tls(&self) -> bool {
        self.capability_level() >= NATIVE_TLS_CAPABILITY_LEVEL
    }
}

/// Platform whose capability level is fixed at construction
///
/// The host declares the level it runs at in `[platform] capability_level`.
///
/// # Examples
///
/// ```
/// use latch_engine::platform::{ConfiguredPlatform, PlatformInfo};
///
/// assert!(!ConfiguredPlatform::new(28).provides_native_tls());
/// assert!(ConfiguredPlatform::new(29).provides_native_tls());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredPlatform {
    level: u32,
}

impl ConfiguredPlatform {
    pub fn new(level: u32) -> Self {
        Self { level }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.platform.capability_level)
    }
}

impl PlatformInfo for ConfiguredPlatform {
    fn capability_level(&self) -> u32 {
        self.level
    }
}

/// Get the platform-specific shared library extension
///
/// - Linux: "so"
/// - macOS: "dylib"
/// - Windows: "dll"
pub fn library_extension() -> &'static str {
    #[cfg(target_os = "linux")]
    return "so";

    #[cfg(target_os = "macos")]
    return "dylib";

    #[cfg(target_os = "windows")]
    return "dll";

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "so"; // Default to .so for unknown platforms
}

/// Get the platform-specific shared library prefix
pub fn library_prefix() -> &'static str {
    #[cfg(unix)]
    return "lib";

    #[cfg(windows)]
    return "";
}

/// Construct a platform-specific library filename
///
/// Dashes in package names become underscores, matching the file cargo emits
/// for a cdylib crate.
///
/// # Examples
///
/// ```
/// use latch_engine::platform::library_filename;
///
/// let filename = library_filename("tls-provider");
///
/// #[cfg(target_os = "linux")]
/// assert_eq!(filename, "libtls_provider.so");
///
/// #[cfg(target_os = "macos")]
/// assert_eq!(filename, "libtls_provider.dylib");
///
/// #[cfg(target_os = "windows")]
/// assert_eq!(filename, "tls_provider.dll");
/// ```
pub fn library_filename(name: &str) -> String {
    format!(
        "{}{}.{}",
        library_prefix(),
        name.replace('-', "_"),
        library_extension()
    )
}
