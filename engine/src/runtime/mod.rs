//! Runtime module for binding and invoking extension entry points
//!
//! This module defines the dynamic loading contract the installer talks to,
//! and two implementations:
//! - NativeLoader: opens an extension's shared library and resolves its
//!   exported factory symbol
//! - FactoryLoader: resolves extensions from factories registered in-process,
//!   for hosts that link an extension statically

pub mod factory;
pub mod native;

pub use factory::FactoryLoader;
pub use native::NativeLoader;

use latch_sdk::errors::LoaderError;
use latch_sdk::extension::{CapabilityExtension, DEFAULT_ENTRY_SYMBOL};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Name of the designated entry point inside an extension package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Exported factory symbol
    pub symbol: String,
}

impl EntryPoint {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

impl Default for EntryPoint {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_SYMBOL)
    }
}

/// A resolved entry point that can be invoked with no arguments
pub trait Invocable: Send {
    /// Name the extension reports for itself
    fn name(&self) -> &str;

    /// Version the extension reports for itself
    fn version(&self) -> &str;

    /// Invoke the entry point
    ///
    /// Failures, including panics inside the extension, surface as errors.
    fn invoke(&self) -> Result<(), LoaderError>;
}

/// Dynamic loading subsystem
pub trait DynamicLoader: Send + Sync {
    /// Bind to a trusted package and resolve its entry point
    ///
    /// Must only be called after the package passed the trust check.
    fn load_entry_point(
        &self,
        package: &str,
        entry: &EntryPoint,
    ) -> Result<Box<dyn Invocable>, LoaderError>;
}

/// Call `install()` on an extension, converting a panic into an error
pub(crate) fn install_guarded(extension: &dyn CapabilityExtension) -> Result<(), LoaderError> {
    catch_unwind(AssertUnwindSafe(|| extension.install()))
        .map_err(|payload| LoaderError::InstallPanicked(panic_message(payload.as_ref())))?
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
