//! TLS Provider Extension
//!
//! Native extension that installs the ring-backed rustls crypto provider as
//! the process default, giving hosts on older platforms modern TLS.

use latch_sdk::{CapabilityExtension, LoaderError};
use rustls::crypto::CryptoProvider;

pub struct TlsProvider;

impl TlsProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TlsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityExtension for TlsProvider {
    fn name(&self) -> &str {
        "tls-provider"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn install(&self) -> Result<(), LoaderError> {
        // Another provider already being the default is fine
        if CryptoProvider::get_default().is_some() {
            return Ok(());
        }

        let provider = rustls::crypto::ring::default_provider();
        if provider.cipher_suites.is_empty() {
            return Err(LoaderError::InstallFailed(
                "ring provider has no cipher suites".to_string(),
            ));
        }

        match provider.install_default() {
            Ok(()) => Ok(()),
            // Another installer won the race; fine as long as a default now exists
            Err(_) if CryptoProvider::get_default().is_some() => Ok(()),
            Err(_) => Err(LoaderError::InstallFailed(
                "could not install the ring provider as process default".to_string(),
            )),
        }
    }
}

latch_sdk::declare_extension!(TlsProvider, TlsProvider::new);
