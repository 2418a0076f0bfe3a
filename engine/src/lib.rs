//! Latch Engine Library
//!
//! This library provides the trusted extension loader used by the `latch`
//! binary and integration tests.

/// Configuration management module
pub mod config;

/// Certificate fingerprint and digest module
pub mod crypto;

/// Platform capability module
pub mod platform;

/// Installed package registry module
pub mod registry;

/// Runtime module for binding extension entry points
pub mod runtime;

/// Trust anchors and signature verification module
pub mod trust;

/// Extension installer and process-wide load state
pub mod installer;

/// Install prompt module
pub mod prompt;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
