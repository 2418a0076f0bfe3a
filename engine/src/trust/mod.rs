//! Trust anchors and the two-stage signature check
//!
//! A candidate extension is trusted when either:
//!
//! 1. **Same signer**: it was signed with the host's own certificate (local
//!    development builds), or
//! 2. **Allow-list**: its certificate fingerprint equals, ignoring case, one of
//!    the fixed release-channel fingerprints below.
//!
//! The anchor set is closed: it is compiled in and cannot be widened through
//! configuration.

use crate::crypto::Fingerprint;
use crate::registry::PackageRegistry;
use latch_sdk::errors::LoaderError;
use serde::Serialize;

/// Signing certificate of the GitHub release channel
pub const GITHUB_RELEASE_FINGERPRINT: &str =
    "C7:90:8D:17:33:76:1D:F3:CD:EB:56:67:16:C8:00:B5:AF:C5:57:DB";

/// Signing certificate of the F-Droid release channel
pub const FDROID_RELEASE_FINGERPRINT: &str =
    "05:F2:E6:59:28:08:89:81:B3:17:FC:9A:6D:BF:E0:4B:0F:A1:3B:4E";

/// A fingerprint trusted on behalf of a named distribution channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustAnchor {
    pub channel: &'static str,
    pub fingerprint: &'static str,
}

/// The allow-listed release channels
pub const TRUST_ANCHORS: [TrustAnchor; 2] = [
    TrustAnchor {
        channel: "github",
        fingerprint: GITHUB_RELEASE_FINGERPRINT,
    },
    TrustAnchor {
        channel: "f-droid",
        fingerprint: FDROID_RELEASE_FINGERPRINT,
    },
];

/// Why a candidate was trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "channel", rename_all = "snake_case")]
pub enum TrustSource {
    /// Signed with the host's own certificate
    SameSigner,
    /// Fingerprint matched the named release channel
    AllowList(&'static str),
}

impl std::fmt::Display for TrustSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SameSigner => f.write_str("same signer as host"),
            Self::AllowList(channel) => write!(f, "{} release signature", channel),
        }
    }
}

/// Find the anchor a fingerprint matches, ignoring case
pub fn match_anchor(fingerprint: &Fingerprint) -> Option<&'static TrustAnchor> {
    TRUST_ANCHORS
        .iter()
        .find(|anchor| fingerprint.matches(anchor.fingerprint))
}

/// Run the two-stage trust check for `candidate`
///
/// # Errors
///
/// - `LoaderError::UntrustedSignature` if both stages were evaluated and
///   neither matched
/// - `LoaderError::SignatureQueryFailed` if the allow-list stage could not be
///   evaluated because the candidate's fingerprint could not be read
///
/// A failed identity query is logged and the allow-list stage still runs.
pub fn verify_candidate(
    registry: &dyn PackageRegistry,
    host_package: &str,
    candidate: &str,
) -> Result<TrustSource, LoaderError> {
    // Stage 1: same signer as the host
    match registry.signatures_match(host_package, candidate) {
        Ok(true) => {
            tracing::debug!("'{}' is signed with the host certificate", candidate);
            return Ok(TrustSource::SameSigner);
        }
        Ok(false) => {
            tracing::debug!("'{}' is not signed with the host certificate", candidate);
        }
        Err(e) => {
            tracing::warn!(
                "Could not compare signatures of '{}' and '{}': {}",
                host_package,
                candidate,
                e
            );
        }
    }

    // Stage 2: release-channel allow-list
    let fingerprint = registry.signature_fingerprint(candidate).map_err(|e| match e {
        LoaderError::SignatureQueryFailed { .. } => e,
        other => LoaderError::SignatureQueryFailed {
            package: candidate.to_string(),
            reason: other.to_string(),
        },
    })?;

    match match_anchor(&fingerprint) {
        Some(anchor) => {
            tracing::debug!(
                "'{}' fingerprint {} matches the {} channel",
                candidate,
                fingerprint,
                anchor.channel
            );
            Ok(TrustSource::AllowList(anchor.channel))
        }
        None => Err(LoaderError::UntrustedSignature(candidate.to_string())),
    }
}
