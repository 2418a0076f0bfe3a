//! Capability extension trait and export macro
//!
//! This module defines the CapabilityExtension trait that every separately
//! distributed extension must implement, and the symbol contract the host uses
//! to construct it from a native shared library.

use crate::errors::LoaderError;

/// ABI version of this SDK
///
/// Extensions declare a semver requirement on this version in their
/// `package.toml`; the host refuses to open libraries whose requirement it
/// does not satisfy.
pub const ABI_VERSION: &str = "0.1.0";

/// Default name of the exported factory symbol
pub const DEFAULT_ENTRY_SYMBOL: &str = "latch_create_extension";

/// Signature of the exported factory symbol
///
/// Uses the `C-unwind` ABI so a panicking constructor unwinds into the host,
/// where it is caught, instead of aborting the process.
#[allow(improper_ctypes_definitions)]
pub type ExtensionFactory = unsafe extern "C-unwind" fn() -> *mut dyn CapabilityExtension;

/// Trait that all capability extensions must implement
pub trait CapabilityExtension: Send + Sync {
    /// Returns the name of the extension
    fn name(&self) -> &str;

    /// Returns the version of the extension
    fn version(&self) -> &str;

    /// Install the capability into the host process
    ///
    /// Called at most once per process by the host, after the extension's
    /// signature has been verified.
    fn install(&self) -> Result<(), LoaderError>;
}

/// Export a [`CapabilityExtension`] implementation from a cdylib
///
/// Generates the `latch_create_extension` factory symbol the host resolves.
///
/// ```ignore
/// latch_sdk::declare_extension!(TlsProvider, TlsProvider::new);
/// ```
#[macro_export]
macro_rules! declare_extension {
    ($ty:ty, $ctor:path) => {
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C-unwind" fn latch_create_extension(
        ) -> *mut dyn $crate::extension::CapabilityExtension {
            let extension: ::std::boxed::Box<dyn $crate::extension::CapabilityExtension> =
                ::std::boxed::Box::new($ctor());
            ::std::boxed::Box::into_raw(extension)
        }
    };
}
