//! Package manifest types for extension metadata
//!
//! Every installed package carries a `package.toml` next to its shared
//! library and signing certificate:
//!
//! ```toml
//! name = "tls-provider"
//! version = "1.2.0"
//! library = "libtls_provider.so"
//! abi_version = "^0.1"
//! ```

use crate::errors::LoaderError;
use serde::{Deserialize, Serialize};

/// File name of the manifest inside a package directory
pub const MANIFEST_FILE: &str = "package.toml";

/// File name of the DER-encoded signing certificate inside a package directory
pub const SIGNER_FILE: &str = "signer.der";

/// Package manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    /// Shared library file name, relative to the package directory
    ///
    /// Defaults to the platform-specific name derived from the package name.
    #[serde(default)]
    pub library: Option<String>,
    /// Semver requirement on the host SDK ABI
    pub abi_version: String,
}

impl PackageManifest {
    /// Parse a manifest from TOML
    pub fn from_toml(package: &str, contents: &str) -> Result<Self, LoaderError> {
        let manifest: PackageManifest =
            toml::from_str(contents).map_err(|e| LoaderError::InvalidManifest {
                package: package.to_string(),
                reason: e.to_string(),
            })?;

        if manifest.name != package {
            return Err(LoaderError::InvalidManifest {
                package: package.to_string(),
                reason: format!("manifest declares name '{}'", manifest.name),
            });
        }

        // The library must sit directly inside the package directory
        if let Some(library) = &manifest.library {
            if library.is_empty()
                || library.contains('/')
                || library.contains('\\')
                || library == ".."
            {
                return Err(LoaderError::InvalidManifest {
                    package: package.to_string(),
                    reason: format!("invalid library file name '{}'", library),
                });
            }
        }

        Ok(manifest)
    }

    /// Serialize manifest to TOML
    pub fn to_toml(&self) -> Result<String, LoaderError> {
        toml::to_string_pretty(self).map_err(|e| LoaderError::InvalidManifest {
            package: self.name.clone(),
            reason: e.to_string(),
        })
    }
}
