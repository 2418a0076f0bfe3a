//! Package registry
//!
//! The registry answers the three questions the trust check asks about an
//! installed package: is it there, what is its signing fingerprint, and was it
//! signed by the same certificate as another package.
//!
//! [`FilesystemRegistry`] keeps one directory per package under a root:
//!
//! ```text
//! <root>/
//!   latch-host/
//!     package.toml
//!     signer.der
//!   tls-provider/
//!     package.toml
//!     signer.der
//!     libtls_provider.so
//! ```

use crate::crypto::{certificate_digest, Fingerprint};
use crate::platform::library_filename;
use latch_sdk::errors::LoaderError;
use latch_sdk::manifest::{PackageManifest, MANIFEST_FILE, SIGNER_FILE};
use std::fs;
use std::path::{Path, PathBuf};

/// System package registry
pub trait PackageRegistry: Send + Sync {
    /// Whether the named package is installed
    fn is_installed(&self, name: &str) -> bool;

    /// SHA-1 colon-hex fingerprint of the package's signing certificate
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::SignatureQueryFailed` if the signature cannot be
    /// read. A readable signature that simply differs is not an error.
    fn signature_fingerprint(&self, name: &str) -> Result<Fingerprint, LoaderError>;

    /// Whether two packages were signed by the same certificate
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::SignatureQueryFailed` if either signature cannot
    /// be read; `Ok(false)` means both were read and differ.
    fn signatures_match(&self, own: &str, other: &str) -> Result<bool, LoaderError>;
}

/// Registry backed by a directory of package directories
#[derive(Debug, Clone)]
pub struct FilesystemRegistry {
    root: PathBuf,
}

impl FilesystemRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a package, after validating its name
    pub fn package_dir(&self, name: &str) -> Result<PathBuf, LoaderError> {
        validate_package_name(name)?;
        Ok(self.root.join(name))
    }

    /// Read and parse a package's manifest
    pub fn manifest(&self, name: &str) -> Result<PackageManifest, LoaderError> {
        let path = self.package_dir(name)?.join(MANIFEST_FILE);
        let contents = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoaderError::NotPresent(name.to_string())
            } else {
                LoaderError::InvalidManifest {
                    package: name.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        PackageManifest::from_toml(name, &contents)
    }

    /// Path of a package's shared library
    pub fn library_path(&self, name: &str) -> Result<PathBuf, LoaderError> {
        let manifest = self.manifest(name)?;
        let library = manifest
            .library
            .unwrap_or_else(|| library_filename(&manifest.name));
        Ok(self.package_dir(name)?.join(library))
    }

    /// Names of all installed packages, sorted
    pub fn list(&self) -> Result<Vec<String>, LoaderError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if self.is_installed(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_signer(&self, name: &str) -> Result<Vec<u8>, LoaderError> {
        let path = self.package_dir(name)?.join(SIGNER_FILE);
        let der = fs::read(&path).map_err(|e| LoaderError::SignatureQueryFailed {
            package: name.to_string(),
            reason: format!("cannot read {}: {}", SIGNER_FILE, e),
        })?;

        if der.is_empty() {
            return Err(LoaderError::SignatureQueryFailed {
                package: name.to_string(),
                reason: format!("{} is empty", SIGNER_FILE),
            });
        }

        Ok(der)
    }
}

impl PackageRegistry for FilesystemRegistry {
    fn is_installed(&self, name: &str) -> bool {
        match self.package_dir(name) {
            Ok(dir) => dir.join(MANIFEST_FILE).is_file(),
            Err(_) => false,
        }
    }

    fn signature_fingerprint(&self, name: &str) -> Result<Fingerprint, LoaderError> {
        let der = self.read_signer(name)?;
        Ok(Fingerprint::of_certificate(&der))
    }

    fn signatures_match(&self, own: &str, other: &str) -> Result<bool, LoaderError> {
        let own_digest = certificate_digest(&self.read_signer(own)?);
        let other_digest = certificate_digest(&self.read_signer(other)?);
        Ok(own_digest == other_digest)
    }
}

/// Reject names that could escape the registry root
fn validate_package_name(name: &str) -> Result<(), LoaderError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0');

    if valid {
        Ok(())
    } else {
        Err(LoaderError::InvalidPackageName(name.to_string()))
    }
}
