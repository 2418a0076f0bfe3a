//! Error types and handling
//!
//! This module provides the error type shared by the loader and by extensions.
//! All errors implement the `LatchErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Failure Taxonomy
//!
//! Every error maps onto a [`FailureKind`]. The loader never propagates any of
//! them to its caller; the kind only decides how loudly a failure is logged:
//!
//! - **NotPresent**: the extension is not installed (expected, debug level)
//! - **UntrustedSignature**: present but failed both trust checks (error level)
//! - **SignatureQueryFailed**: the signature could not be queried at all
//! - **LoadFailure**: trusted, but binding or invoking the entry point failed

use thiserror::Error;

/// Trait for Latch error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information.
pub trait LatchErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and never contains file paths
    /// or certificate material.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors go away once the user installs, updates or
    /// reinstalls the extension. Non-recoverable errors mean the installed
    /// artifact must not be trusted.
    fn is_recoverable(&self) -> bool;
}

/// Coarse classification of a loader failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotPresent,
    UntrustedSignature,
    SignatureQueryFailed,
    LoadFailure,
    Other,
}

/// Main loader error type
///
/// # Examples
///
/// ```
/// use latch_sdk::errors::{FailureKind, LatchErrorExt, LoaderError};
///
/// let error = LoaderError::NotPresent("tls-provider".to_string());
/// assert_eq!(error.kind(), FailureKind::NotPresent);
/// assert!(error.is_recoverable());
///
/// let rejected = LoaderError::UntrustedSignature("tls-provider".to_string());
/// assert!(!rejected.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum LoaderError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Registry errors
    #[error("Package not installed: {0}")]
    NotPresent(String),

    #[error("Invalid package name: {0:?}")]
    InvalidPackageName(String),

    #[error("Invalid package manifest for {package}: {reason}")]
    InvalidManifest { package: String, reason: String },

    // Security errors
    #[error("Package {0} found, but with an invalid signature")]
    UntrustedSignature(String),

    #[error("Signature query failed for {package}: {reason}")]
    SignatureQueryFailed { package: String, reason: String },

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    // Library loading errors
    #[error("Library load failed: {0}")]
    LibraryLoadFailed(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Incompatible extension {package}: requires SDK ABI {required}, host provides {provided}")]
    IncompatibleAbi {
        package: String,
        required: String,
        provided: String,
    },

    #[error("Extension install failed: {0}")]
    InstallFailed(String),

    #[error("Extension panicked during install: {0}")]
    InstallPanicked(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoaderError {
    /// Classify this error into the loader's failure taxonomy
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotPresent(_) => FailureKind::NotPresent,
            Self::UntrustedSignature(_) => FailureKind::UntrustedSignature,
            Self::SignatureQueryFailed { .. } | Self::InvalidFingerprint(_) => {
                FailureKind::SignatureQueryFailed
            }
            Self::InvalidManifest { .. }
            | Self::LibraryLoadFailed(_)
            | Self::SymbolNotFound(_)
            | Self::IncompatibleAbi { .. }
            | Self::InstallFailed(_)
            | Self::InstallPanicked(_) => FailureKind::LoadFailure,
            Self::Config(_) | Self::InvalidPackageName(_) | Self::Io(_) => FailureKind::Other,
        }
    }
}

impl LatchErrorExt for LoaderError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::NotPresent(_) => "Install the TLS provider extension to enable modern TLS",
            Self::InvalidPackageName(_) => "Package names may not contain path separators",
            Self::InvalidManifest { .. } => "Extension package is damaged. Reinstall it",

            Self::UntrustedSignature(_) => {
                "Extension is not signed by a trusted publisher. Reinstall it from the official release page"
            }
            Self::SignatureQueryFailed { .. } => "Could not read the extension signature",
            Self::InvalidFingerprint(_) => "Signature fingerprint is malformed",

            Self::LibraryLoadFailed(_) => "Failed to load extension library",
            Self::SymbolNotFound(_) => "Extension is incompatible with this version",
            Self::IncompatibleAbi { .. } => "Extension was built for a different version. Update it",
            Self::InstallFailed(_) | Self::InstallPanicked(_) => "Extension failed to install itself",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::UntrustedSignature(_)
            | Self::InvalidFingerprint(_)
            | Self::SymbolNotFound(_)
            | Self::InstallPanicked(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_classification() {
        assert_eq!(
            LoaderError::NotPresent("x".into()).kind(),
            FailureKind::NotPresent
        );
        assert_eq!(
            LoaderError::UntrustedSignature("x".into()).kind(),
            FailureKind::UntrustedSignature
        );
        assert_eq!(
            LoaderError::SignatureQueryFailed {
                package: "x".into(),
                reason: "missing signer.der".into()
            }
            .kind(),
            FailureKind::SignatureQueryFailed
        );
        assert_eq!(
            LoaderError::SymbolNotFound("latch_create_extension".into()).kind(),
            FailureKind::LoadFailure
        );
        assert_eq!(
            LoaderError::Config("bad".into()).kind(),
            FailureKind::Other
        );
    }

    #[test]
    fn test_hints_do_not_leak_details() {
        let error = LoaderError::LibraryLoadFailed("/secret/path/libtls.so".into());
        assert!(!error.user_hint().contains("/secret/path"));
    }

    #[test]
    fn test_untrusted_message_names_condition() {
        let error = LoaderError::UntrustedSignature("tls-provider".into());
        assert_eq!(
            error.to_string(),
            "Package tls-provider found, but with an invalid signature"
        );
    }
}
