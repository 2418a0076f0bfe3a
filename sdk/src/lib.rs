//! Latch SDK
//!
//! Shared library providing the extension contract, manifest types and errors.
//! This crate is used by both the loader engine and extensions.

/// Capability extension trait and export macro
pub mod extension;

/// Error types and handling
pub mod errors;

/// Package manifest types
pub mod manifest;

// Re-export commonly used types
pub use errors::{FailureKind, LatchErrorExt, LoaderError};
pub use extension::{CapabilityExtension, ExtensionFactory, ABI_VERSION, DEFAULT_ENTRY_SYMBOL};
pub use manifest::{PackageManifest, MANIFEST_FILE, SIGNER_FILE};
