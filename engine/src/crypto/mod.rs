//! Cryptographic operations module
//!
//! This module provides the signature primitives the trust check is built on:
//! - SHA-1 signing-certificate fingerprints in colon-hex form
//!   (`C7:90:8D:...`), the format publishers print next to their releases
//! - SHA-256 certificate digests for exact signer identity comparison
//!
//! # Security
//!
//! Fingerprints are compared case-insensitively but otherwise exactly. A
//! string that is not well-formed colon-hex never matches anything.

use latch_sdk::errors::LoaderError;
use regex::Regex;
use serde::{Serialize, Serializer};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static FINGERPRINT_PATTERN: OnceLock<Regex> = OnceLock::new();

fn fingerprint_pattern() -> &'static Regex {
    FINGERPRINT_PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2})+$").expect("Invalid fingerprint pattern")
    })
}

/// Colon-separated hexadecimal fingerprint of a signing certificate
///
/// # Examples
///
/// ```
/// use latch_engine::crypto::Fingerprint;
///
/// let fp: Fingerprint = "c7:90:8d:17".parse().unwrap();
/// assert!(fp.matches("C7:90:8D:17"));
/// assert!(!fp.matches("C7:90:8D:18"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a colon-hex fingerprint, keeping its original case
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::InvalidFingerprint` if the string is not a
    /// sequence of at least two hex byte pairs separated by colons.
    pub fn parse(value: &str) -> Result<Self, LoaderError> {
        let trimmed = value.trim();
        if !fingerprint_pattern().is_match(trimmed) {
            return Err(LoaderError::InvalidFingerprint(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Compute the SHA-1 fingerprint of a DER-encoded certificate
    pub fn of_certificate(der: &[u8]) -> Self {
        let digest = Sha1::digest(der);
        Self(colon_hex(&digest))
    }

    /// Compare against another fingerprint, ignoring case
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Compute the SHA-256 digest of a DER-encoded certificate as lowercase hex
///
/// Two packages share a signer exactly when their certificate digests are
/// equal.
pub fn certificate_digest(der: &[u8]) -> String {
    hex::encode(Sha256::digest(der))
}

fn colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(":")
}
