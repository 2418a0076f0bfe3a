//! Configuration management
//!
//! This module handles loading, validation, and management of the Latch configuration.
//! Configuration is stored in TOML format at ~/.latch/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **host**: The host application's own package name
//! - **registry**: Where installed packages live
//! - **extension**: Which package provides the capability and where users get it
//! - **platform**: The capability level the host runs at
//!
//! Trust anchors are deliberately absent: the accepted signer fingerprints are
//! compiled into the binary (see [`crate::trust`]).
//!
//! # Examples
//!
//! ```no_run
//! use latch_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Extension package: {}", config.extension.package);
//! # Ok(())
//! # }
//! ```

use latch_sdk::errors::LoaderError;
use latch_sdk::extension::DEFAULT_ENTRY_SYMBOL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Host application identity
    pub host: HostConfig,

    /// Package registry location
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Extension candidate settings
    #[serde(default)]
    pub extension: ExtensionConfig,

    /// Platform capability settings
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Host application identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Package name of the host itself, as installed in the registry
    pub package: String,
}

/// Package registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory holding one subdirectory per installed package (supports ~ expansion)
    #[serde(default = "default_registry_root")]
    pub root: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: default_registry_root(),
        }
    }
}

/// Extension candidate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Package name of the optional capability extension
    #[serde(default = "default_extension_package")]
    pub package: String,

    /// Exported factory symbol of the extension's entry point
    #[serde(default = "default_entry_symbol")]
    pub entry_symbol: String,

    /// Page where users can download the extension
    #[serde(default = "default_distribution_url")]
    pub distribution_url: String,

    /// Title of the install prompt entry
    #[serde(default = "default_prompt_title")]
    pub prompt_title: String,

    /// Summary of the install prompt entry
    #[serde(default = "default_prompt_summary")]
    pub prompt_summary: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            package: default_extension_package(),
            entry_symbol: default_entry_symbol(),
            distribution_url: default_distribution_url(),
            prompt_title: default_prompt_title(),
            prompt_summary: default_prompt_summary(),
        }
    }
}

/// Platform capability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Capability level of the platform the host runs on
    #[serde(default)]
    pub capability_level: u32,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_registry_root() -> PathBuf {
    PathBuf::from("~/.latch/packages")
}

fn default_host_package() -> String {
    "latch-host".to_string()
}

fn default_extension_package() -> String {
    "tls-provider".to_string()
}

fn default_entry_symbol() -> String {
    DEFAULT_ENTRY_SYMBOL.to_string()
}

fn default_distribution_url() -> String {
    "https://github.com/mendhak/Conscrypt-Provider/releases".to_string()
}

fn default_prompt_title() -> String {
    "Install the TLS provider".to_string()
}

fn default_prompt_summary() -> String {
    "This platform lacks TLS 1.3. Install the TLS provider extension to connect to modern servers."
        .to_string()
}

impl Config {
    /// Load configuration from the default location (~/.latch/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, LoaderError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, LoaderError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| LoaderError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, LoaderError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| LoaderError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, LoaderError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LoaderError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so ~ stays unexpanded on disk
        let config = Self::default_config();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| LoaderError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| LoaderError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.latch/config.toml)
    fn default_config_path() -> Result<PathBuf, LoaderError> {
        let home = dirs::home_dir()
            .ok_or_else(|| LoaderError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".latch").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            host: HostConfig {
                package: default_host_package(),
            },
            registry: RegistryConfig::default(),
            extension: ExtensionConfig::default(),
            platform: PlatformConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level
    /// - Validates package names and the distribution URL
    /// - Expands ~ in paths
    fn validate_and_process(&mut self) -> Result<(), LoaderError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(LoaderError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.host.package.trim().is_empty() {
            return Err(LoaderError::Config(
                "host.package must not be empty".to_string(),
            ));
        }

        if self.extension.package.trim().is_empty() {
            return Err(LoaderError::Config(
                "extension.package must not be empty".to_string(),
            ));
        }

        if self.extension.package == self.host.package {
            return Err(LoaderError::Config(
                "extension.package must differ from host.package".to_string(),
            ));
        }

        if self.extension.entry_symbol.trim().is_empty() {
            return Err(LoaderError::Config(
                "extension.entry_symbol must not be empty".to_string(),
            ));
        }

        let url = self.extension.distribution_url.as_str();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(LoaderError::Config(format!(
                "extension.distribution_url must be an http(s) URL, got '{}'",
                url
            )));
        }

        self.registry.root = expand_path(&self.registry.root)?;

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
///
/// # Examples
///
/// ```ignore
/// let path = PathBuf::from("~/.latch/packages");
/// let expanded = expand_path(&path)?;
/// // expanded is now /home/user/.latch/packages (on Unix)
/// ```
fn expand_path(path: &Path) -> Result<PathBuf, LoaderError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| LoaderError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| LoaderError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| LoaderError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
