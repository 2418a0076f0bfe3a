//! Integration tests for the trusted extension installer
//!
//! These tests drive `install_if_needed` against an in-memory registry and
//! loader that count every query, to verify:
//! - The platform gate short-circuits before any registry query
//! - Code is only bound after the trust check passes
//! - Failures are contained and leave the host prompting
//! - The entry point runs at most once, even under concurrency

use latch_engine::crypto::Fingerprint;
use latch_engine::installer::{ExtensionInstaller, HostContext, InstallOutcome, LoadState};
use latch_engine::platform::{ConfiguredPlatform, NATIVE_TLS_CAPABILITY_LEVEL};
use latch_engine::registry::PackageRegistry;
use latch_engine::runtime::{DynamicLoader, EntryPoint, FactoryLoader, Invocable};
use latch_engine::trust::{TrustSource, FDROID_RELEASE_FINGERPRINT, GITHUB_RELEASE_FINGERPRINT};
use latch_sdk::{CapabilityExtension, FailureKind, LoaderError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const HOST: &str = "latch-host";
const EXTENSION: &str = "tls-provider";
const OLD_PLATFORM: u32 = 21;
const UNKNOWN_FINGERPRINT: &str = "AA:BB:CC:DD:EE:FF:00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD";

// Mock registry

#[derive(Clone, Copy)]
enum Identity {
    Same,
    Different,
    QueryFails,
}

struct MockRegistry {
    present: bool,
    identity: Identity,
    fingerprint: Option<&'static str>,
    presence_calls: AtomicUsize,
    identity_calls: AtomicUsize,
    fingerprint_calls: AtomicUsize,
}

impl MockRegistry {
    fn new(present: bool, identity: Identity, fingerprint: Option<&'static str>) -> Self {
        Self {
            present,
            identity,
            fingerprint,
            presence_calls: AtomicUsize::new(0),
            identity_calls: AtomicUsize::new(0),
            fingerprint_calls: AtomicUsize::new(0),
        }
    }

    fn total_calls(&self) -> usize {
        self.presence_calls.load(Ordering::SeqCst)
            + self.identity_calls.load(Ordering::SeqCst)
            + self.fingerprint_calls.load(Ordering::SeqCst)
    }
}

impl PackageRegistry for MockRegistry {
    fn is_installed(&self, name: &str) -> bool {
        self.presence_calls.fetch_add(1, Ordering::SeqCst);
        self.present && name == EXTENSION
    }

    fn signature_fingerprint(&self, name: &str) -> Result<Fingerprint, LoaderError> {
        self.fingerprint_calls.fetch_add(1, Ordering::SeqCst);
        match self.fingerprint {
            Some(fp) => Fingerprint::parse(fp),
            None => Err(LoaderError::SignatureQueryFailed {
                package: name.to_string(),
                reason: "signature unavailable".to_string(),
            }),
        }
    }

    fn signatures_match(&self, _own: &str, other: &str) -> Result<bool, LoaderError> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        match self.identity {
            Identity::Same => Ok(true),
            Identity::Different => Ok(false),
            Identity::QueryFails => Err(LoaderError::SignatureQueryFailed {
                package: other.to_string(),
                reason: "signature unavailable".to_string(),
            }),
        }
    }
}

// Mock loader

#[derive(Clone, Copy)]
enum Behavior {
    Succeeds,
    BindFails,
    InvokeFails,
}

struct MockLoader {
    behavior: Behavior,
    loads: AtomicUsize,
    invocations: Arc<AtomicUsize>,
}

impl MockLoader {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            loads: AtomicUsize::new(0),
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

struct MockInvocable {
    fails: bool,
    invocations: Arc<AtomicUsize>,
}

impl Invocable for MockInvocable {
    fn name(&self) -> &str {
        "mock-tls"
    }

    fn version(&self) -> &str {
        "2.0.0"
    }

    fn invoke(&self) -> Result<(), LoaderError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            Err(LoaderError::InstallFailed("provider rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

impl DynamicLoader for MockLoader {
    fn load_entry_point(
        &self,
        package: &str,
        _entry: &EntryPoint,
    ) -> Result<Box<dyn Invocable>, LoaderError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::BindFails => Err(LoaderError::LibraryLoadFailed(format!(
                "cannot open {}",
                package
            ))),
            Behavior::Succeeds | Behavior::InvokeFails => Ok(Box::new(MockInvocable {
                fails: matches!(self.behavior, Behavior::InvokeFails),
                invocations: Arc::clone(&self.invocations),
            })),
        }
    }
}

// Helpers

fn installer(level: u32) -> ExtensionInstaller {
    ExtensionInstaller::new(
        EXTENSION,
        EntryPoint::default(),
        Arc::new(ConfiguredPlatform::new(level)),
        Arc::new(LoadState::new()),
    )
}

fn host(registry: &Arc<MockRegistry>, loader: &Arc<MockLoader>) -> HostContext {
    HostContext::new(
        HOST,
        Arc::clone(registry) as Arc<dyn PackageRegistry>,
        Arc::clone(loader) as Arc<dyn DynamicLoader>,
    )
}

fn expect_skipped(outcome: InstallOutcome, kind: FailureKind) {
    match outcome {
        InstallOutcome::Skipped(e) => assert_eq!(e.kind(), kind, "unexpected error: {}", e),
        other => panic!("expected Skipped({:?}), got {:?}", kind, other),
    }
}

// Platform gate

#[test]
fn test_native_platform_never_queries_registry() {
    for level in [NATIVE_TLS_CAPABILITY_LEVEL, NATIVE_TLS_CAPABILITY_LEVEL + 5] {
        let registry = Arc::new(MockRegistry::new(
            true,
            Identity::Same,
            Some(GITHUB_RELEASE_FINGERPRINT),
        ));
        let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
        let installer = installer(level);

        let outcome = installer.install_if_needed(&host(&registry, &loader));

        assert!(matches!(outcome, InstallOutcome::NativelySupported));
        assert_eq!(registry.total_calls(), 0);
        assert_eq!(loader.loads(), 0);
        assert!(!installer.should_prompt_installation());
    }
}

#[test]
fn test_level_below_threshold_attempts_install() {
    let registry = Arc::new(MockRegistry::new(
        true,
        Identity::Different,
        Some(GITHUB_RELEASE_FINGERPRINT),
    ));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let installer = installer(NATIVE_TLS_CAPABILITY_LEVEL - 1);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    assert!(matches!(outcome, InstallOutcome::Installed(_)));
}

// Trust decisions

#[test]
fn test_same_signer_is_trusted_without_allow_list() {
    let registry = Arc::new(MockRegistry::new(true, Identity::Same, Some(UNKNOWN_FINGERPRINT)));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    assert!(matches!(
        outcome,
        InstallOutcome::Installed(TrustSource::SameSigner)
    ));
    assert_eq!(registry.fingerprint_calls.load(Ordering::SeqCst), 0);
    assert_eq!(loader.invocations(), 1);
}

#[test]
fn test_lowercase_allow_listed_fingerprint_is_trusted() {
    let lowercase: &'static str =
        Box::leak(GITHUB_RELEASE_FINGERPRINT.to_lowercase().into_boxed_str());
    let registry = Arc::new(MockRegistry::new(true, Identity::Different, Some(lowercase)));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    assert!(matches!(
        outcome,
        InstallOutcome::Installed(TrustSource::AllowList("github"))
    ));
}

#[test]
fn test_fdroid_fingerprint_is_trusted() {
    let registry = Arc::new(MockRegistry::new(
        true,
        Identity::Different,
        Some(FDROID_RELEASE_FINGERPRINT),
    ));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    assert!(matches!(
        outcome,
        InstallOutcome::Installed(TrustSource::AllowList("f-droid"))
    ));
}

#[test]
fn test_untrusted_candidate_is_never_bound() {
    let registry = Arc::new(MockRegistry::new(
        true,
        Identity::Different,
        Some(UNKNOWN_FINGERPRINT),
    ));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    expect_skipped(outcome, FailureKind::UntrustedSignature);
    assert_eq!(loader.loads(), 0);
    assert!(!installer.state().is_installed());
    assert!(installer.should_prompt_installation());
}

#[test]
fn test_identity_query_failure_falls_through_to_allow_list() {
    let registry = Arc::new(MockRegistry::new(
        true,
        Identity::QueryFails,
        Some(GITHUB_RELEASE_FINGERPRINT),
    ));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    assert!(matches!(
        outcome,
        InstallOutcome::Installed(TrustSource::AllowList("github"))
    ));
}

#[test]
fn test_unreadable_signature_is_distinct_from_mismatch() {
    let registry = Arc::new(MockRegistry::new(true, Identity::QueryFails, None));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    expect_skipped(outcome, FailureKind::SignatureQueryFailed);
    assert_eq!(loader.loads(), 0);
}

#[test]
fn test_absent_candidate_skips_signature_queries() {
    let registry = Arc::new(MockRegistry::new(
        false,
        Identity::Same,
        Some(GITHUB_RELEASE_FINGERPRINT),
    ));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    expect_skipped(outcome, FailureKind::NotPresent);
    assert_eq!(registry.identity_calls.load(Ordering::SeqCst), 0);
    assert_eq!(registry.fingerprint_calls.load(Ordering::SeqCst), 0);
    assert_eq!(loader.loads(), 0);
    assert!(installer.should_prompt_installation());
}

// Load failures

#[test]
fn test_bind_failure_is_contained() {
    let registry = Arc::new(MockRegistry::new(true, Identity::Same, None));
    let loader = Arc::new(MockLoader::new(Behavior::BindFails));
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    expect_skipped(outcome, FailureKind::LoadFailure);
    assert!(!installer.state().is_installed());
    assert!(installer.state().installed().is_none());
    assert!(installer.should_prompt_installation());
}

#[test]
fn test_invoke_failure_is_contained() {
    let registry = Arc::new(MockRegistry::new(true, Identity::Same, None));
    let loader = Arc::new(MockLoader::new(Behavior::InvokeFails));
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host(&registry, &loader));

    expect_skipped(outcome, FailureKind::LoadFailure);
    assert_eq!(loader.invocations(), 1);
    assert!(installer.should_prompt_installation());
}

#[test]
fn test_failed_attempt_can_be_retried() {
    let registry = Arc::new(MockRegistry::new(true, Identity::Same, None));
    let installer = installer(OLD_PLATFORM);

    let broken = Arc::new(MockLoader::new(Behavior::BindFails));
    let outcome = installer.install_if_needed(&host(&registry, &broken));
    expect_skipped(outcome, FailureKind::LoadFailure);

    let working = Arc::new(MockLoader::new(Behavior::Succeeds));
    let outcome = installer.install_if_needed(&host(&registry, &working));
    assert!(outcome.is_installed());
    assert!(!installer.should_prompt_installation());
}

struct PanickingExtension;

impl CapabilityExtension for PanickingExtension {
    fn name(&self) -> &str {
        "panicking"
    }

    fn version(&self) -> &str {
        "0.0.1"
    }

    fn install(&self) -> Result<(), LoaderError> {
        panic!("provider registration exploded");
    }
}

fn panicking() -> Box<dyn CapabilityExtension> {
    Box::new(PanickingExtension)
}

#[test]
fn test_extension_panic_is_contained() {
    let registry = Arc::new(MockRegistry::new(true, Identity::Same, None));
    let loader = FactoryLoader::new();
    loader.register(EXTENSION, &EntryPoint::default(), panicking);

    let host = HostContext::new(
        HOST,
        Arc::clone(&registry) as Arc<dyn PackageRegistry>,
        Arc::new(loader),
    );
    let installer = installer(OLD_PLATFORM);

    let outcome = installer.install_if_needed(&host);

    match outcome {
        InstallOutcome::Skipped(LoaderError::InstallPanicked(message)) => {
            assert!(message.contains("exploded"));
        }
        other => panic!("expected InstallPanicked, got {:?}", other),
    }
    assert!(installer.should_prompt_installation());
}

// Idempotence

#[test]
fn test_second_install_is_a_no_op() {
    let registry = Arc::new(MockRegistry::new(true, Identity::Same, None));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let installer = installer(OLD_PLATFORM);
    let host = host(&registry, &loader);

    assert!(installer.should_prompt_installation());

    let first = installer.install_if_needed(&host);
    let calls_after_first = registry.total_calls();
    let second = installer.install_if_needed(&host);

    assert!(matches!(first, InstallOutcome::Installed(_)));
    assert!(matches!(second, InstallOutcome::AlreadyInstalled));
    assert_eq!(registry.total_calls(), calls_after_first);
    assert_eq!(loader.loads(), 1);
    assert_eq!(loader.invocations(), 1);
    assert!(!installer.should_prompt_installation());

    let installed = installer.state().installed().unwrap();
    assert_eq!(installed.package, EXTENSION);
    assert_eq!(installed.name, "mock-tls");
    assert_eq!(installed.version, "2.0.0");
    assert_eq!(installed.trust, TrustSource::SameSigner);
}

#[test]
fn test_installers_sharing_state_install_once() {
    let registry = Arc::new(MockRegistry::new(true, Identity::Same, None));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let host = host(&registry, &loader);
    let state = Arc::new(LoadState::new());

    let make = || {
        ExtensionInstaller::new(
            EXTENSION,
            EntryPoint::default(),
            Arc::new(ConfiguredPlatform::new(OLD_PLATFORM)),
            Arc::clone(&state),
        )
    };

    assert!(make().install_if_needed(&host).is_installed());
    assert!(matches!(
        make().install_if_needed(&host),
        InstallOutcome::AlreadyInstalled
    ));
    assert_eq!(loader.invocations(), 1);
}

#[test]
fn test_concurrent_installs_invoke_entry_point_once() {
    let registry = Arc::new(MockRegistry::new(true, Identity::Same, None));
    let loader = Arc::new(MockLoader::new(Behavior::Succeeds));
    let host = host(&registry, &loader);
    let installer = installer(OLD_PLATFORM);

    let outcomes: Vec<InstallOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| installer.install_if_needed(&host)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let installed = outcomes
        .iter()
        .filter(|o| matches!(o, InstallOutcome::Installed(_)))
        .count();
    let already = outcomes
        .iter()
        .filter(|o| matches!(o, InstallOutcome::AlreadyInstalled))
        .count();

    assert_eq!(installed, 1);
    assert_eq!(already, 7);
    assert_eq!(loader.invocations(), 1);
    assert!(installer.state().is_installed());
}
