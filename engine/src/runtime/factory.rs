//! In-process factory loader
//!
//! Hosts that link an extension statically register its constructor here
//! instead of shipping a shared library. The trust check still runs against the
//! package registry before the factory is ever called.

use super::{install_guarded, DynamicLoader, EntryPoint, Invocable};
use latch_sdk::errors::LoaderError;
use latch_sdk::extension::CapabilityExtension;
use std::collections::HashMap;
use std::sync::RwLock;

/// Constructor of an in-process extension
pub type FactoryFn = fn() -> Box<dyn CapabilityExtension>;

/// Loader resolving entry points from registered factories
///
/// Factories are keyed by package name and entry symbol.
#[derive(Default)]
pub struct FactoryLoader {
    factories: RwLock<HashMap<(String, String), FactoryFn>>,
}

impl FactoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for a package's entry point
    pub fn register(&self, package: &str, entry: &EntryPoint, factory: FactoryFn) {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.insert((package.to_string(), entry.symbol.clone()), factory);
    }
}

impl DynamicLoader for FactoryLoader {
    fn load_entry_point(
        &self,
        package: &str,
        entry: &EntryPoint,
    ) -> Result<Box<dyn Invocable>, LoaderError> {
        let factory = {
            let factories = self
                .factories
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            factories
                .get(&(package.to_string(), entry.symbol.clone()))
                .copied()
        };

        let factory = factory.ok_or_else(|| {
            tracing::error!(
                "No factory registered for '{}' entry '{}'",
                package,
                entry.symbol
            );
            LoaderError::SymbolNotFound(entry.symbol.clone())
        })?;

        Ok(Box::new(StaticExtension {
            extension: factory(),
        }))
    }
}

struct StaticExtension {
    extension: Box<dyn CapabilityExtension>,
}

impl Invocable for StaticExtension {
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
