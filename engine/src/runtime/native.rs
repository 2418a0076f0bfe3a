//! Native loader for extension shared libraries
//!
//! This module implements the NativeLoader which binds a trusted extension by
//! opening its shared library (.so/.dylib/.dll) and resolving the factory
//! symbol declared with `latch_sdk::declare_extension!`.
//!
//! # Binding Sequence
//!
//! 1. **Manifest**: read `package.toml` from the registry
//! 2. **ABI check**: the manifest's `abi_version` requirement must accept the
//!    host's `latch_sdk::ABI_VERSION`
//! 3. **Open**: `dlopen` the library
//! 4. **Resolve**: look up the factory symbol and construct the extension
//!
//! Every step reports failure as a `LoaderError`; nothing here panics or aborts
//! the host.
//!
//! # Safety
//!
//! Opening a library runs its initialisers, so the loader must only be asked to
//! bind packages that already passed the trust check.

use super::{install_guarded, panic_message, DynamicLoader, EntryPoint, Invocable};
use crate::registry::FilesystemRegistry;
use latch_sdk::errors::LoaderError;
use latch_sdk::extension::{CapabilityExtension, ExtensionFactory, ABI_VERSION};
use latch_sdk::manifest::PackageManifest;
use semver::{Version, VersionReq};
use std::panic::catch_unwind;

/// Native loader backed by a filesystem registry
pub struct NativeLoader {
    registry: FilesystemRegistry,
}

impl NativeLoader {
    pub fn new(registry: FilesystemRegistry) -> Self {
        Self { registry }
    }

    /// Verify the extension was built against a compatible SDK ABI
    fn check_abi(manifest: &PackageManifest) -> Result<(), LoaderError> {
        let incompatible = || LoaderError::IncompatibleAbi {
            package: manifest.name.clone(),
            required: manifest.abi_version.clone(),
            provided: ABI_VERSION.to_string(),
        };

        let required = VersionReq::parse(&manifest.abi_version).map_err(|e| {
            tracing::error!(
                "Invalid abi_version '{}' in manifest of '{}': {}",
                manifest.abi_version,
                manifest.name,
                e
            );
            incompatible()
        })?;

        let provided = Version::parse(ABI_VERSION)
            .map_err(|e| LoaderError::Config(format!("Invalid host ABI version: {}", e)))?;

        if required.matches(&provided) {
            Ok(())
        } else {
            Err(incompatible())
        }
    }
}

impl DynamicLoader for NativeLoader {
    fn load_entry_point(
        &self,
        package: &str,
        entry: &EntryPoint,
    ) -> Result<Box<dyn Invocable>, LoaderError> {
        tracing::debug!("Binding extension '{}' via '{}'", package, entry.symbol);

        let manifest = self.registry.manifest(package)?;
        Self::check_abi(&manifest)?;

        let library_path = self.registry.library_path(package)?;

        let library = unsafe {
            libloading::Library::new(&library_path).map_err(|e| {
                tracing::error!("Failed to load library {}: {}", library_path.display(), e);
                LoaderError::LibraryLoadFailed(e.to_string())
            })?
        };

        // Copy the function pointer out so the symbol's borrow of the library ends here
        let factory: ExtensionFactory = unsafe {
            let symbol = library
                .get::<ExtensionFactory>(entry.symbol.as_bytes())
                .map_err(|e| {
                    tracing::error!(
                        "Symbol '{}' not found in {}: {}",
                        entry.symbol,
                        library_path.display(),
                        e
                    );
                    LoaderError::SymbolNotFound(entry.symbol.clone())
                })?;
            *symbol
        };

        let ptr = catch_unwind(|| unsafe { factory() }).map_err(|payload| {
            LoaderError::InstallPanicked(panic_message(payload.as_ref()))
        })?;

        if ptr.is_null() {
            tracing::error!("'{}' returned null pointer for '{}'", entry.symbol, package);
            return Err(LoaderError::LibraryLoadFailed(format!(
                "{} returned null",
                entry.symbol
            )));
        }

        let extension = unsafe { Box::from_raw(ptr) };

        tracing::debug!(
            "Bound extension '{}' v{} from {}",
            extension.name(),
            extension.version(),
            library_path.display()
        );

        Ok(Box::new(NativeExtension {
            extension,
            _library: library,
        }))
    }
}

/// An extension constructed from a shared library
///
/// Field order matters: the extension is dropped before its library is
/// unmapped.
struct NativeExtension {
    extension: Box<dyn CapabilityExtension>,
    _library: libloading::Library,
}

impl Invocable for NativeExtension {
    fn name(&self) -> &str {
        self.extension.name()
    }

    fn version(&self) -> &str {
        self.extension.version()
    }

    fn invoke(&self) -> Result<(), LoaderError> {
        install_guarded(self.extension.as_ref())
    }
}
