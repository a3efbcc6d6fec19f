//! End-to-end portability checks against the real `gantry-decode` probe.
//!
//! Cargo builds the probe binary alongside these tests and exposes its path
//! via `CARGO_BIN_EXE_gantry-decode`, so every test here spawns a genuine
//! independent process — the same thing production callers do.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::json;

use gantry_contracts::error::GantryError;
use gantry_portability::{
    config::VerifierConfig,
    format::PayloadFormat,
    verifier::PortabilityVerifier,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Config pointing at the probe cargo built for this test run.
fn probe_config() -> VerifierConfig {
    VerifierConfig::new(env!("CARGO_BIN_EXE_gantry-decode"))
}

fn verifier() -> PortabilityVerifier {
    PortabilityVerifier::new(probe_config())
}

/// A plain aggregate the way task inputs usually look.
#[derive(Serialize)]
struct BatchRequest {
    name: String,
    sizes: Vec<u32>,
    labels: BTreeMap<String, String>,
}

fn sample_request() -> BatchRequest {
    let mut labels = BTreeMap::new();
    labels.insert("team".to_string(), "ingest".to_string());
    labels.insert("priority".to_string(), "high".to_string());
    BatchRequest {
        name: "resize-batch-7".to_string(),
        sizes: vec![640, 1280, 1920],
        labels,
    }
}

/// Stand-in for a value wrapping a live native resource — its Serialize
/// impl refuses at runtime, the way an open handle would.
struct LiveHandle;

impl Serialize for LiveHandle {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom("cannot serialize live socket"))
    }
}

/// A format the stock probe has never heard of. Encoding works fine here;
/// reconstruction fails in the fresh process because only this process
/// knows the format — the cross-process failure the verifier exists to catch.
struct FrameFormat;

impl PayloadFormat for FrameFormat {
    fn name(&self) -> &'static str {
        "frame-v2"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> gantry_contracts::error::GantryResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| GantryError::Encoding {
            reason: e.to_string(),
        })
    }
}

/// Claims to be JSON but writes bytes no decoder accepts. The digest still
/// matches (it is computed over what was actually written), so the probe
/// reaches the decode step and fails there.
struct BrokenJsonFormat;

impl PayloadFormat for BrokenJsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, _value: &T) -> gantry_contracts::error::GantryResult<Vec<u8>> {
        Ok(b"{\"unterminated".to_vec())
    }
}

// ── Verified values ───────────────────────────────────────────────────────────

/// Trivially serializable values verify end-to-end.
#[test]
fn test_integer_verifies() {
    assert!(verifier().is_portable(&42));
}

#[test]
fn test_string_verifies() {
    assert!(verifier().is_portable("hello, remote worker"));
}

#[test]
fn test_plain_aggregate_verifies() {
    assert!(verifier().is_portable(&sample_request()));
}

#[test]
fn test_json_value_verifies() {
    let value = json!({
        "nested": { "list": [1, 2, 3], "flag": true },
        "note": null,
    });
    assert!(verifier().is_portable(&value));
}

// ── Failing values ────────────────────────────────────────────────────────────

/// A value guarding a live resource fails at the encoding step.
#[test]
fn test_live_resource_fails_encoding() {
    let err = verifier().require_portable(&LiveHandle).unwrap_err();
    match err {
        GantryError::Encoding { reason } => {
            assert!(reason.contains("live socket"), "reason: {}", reason);
        }
        other => panic!("expected Encoding, got {:?}", other),
    }
}

/// A format only this process knows fails in the fresh process, and the
/// diagnostic names the missing format.
#[test]
fn test_unknown_format_fails_in_fresh_process() {
    let verifier = PortabilityVerifier::with_format(FrameFormat, probe_config());
    let err = verifier.require_portable(&sample_request()).unwrap_err();

    match err {
        GantryError::Decoding { exit_code, diagnostic } => {
            assert_eq!(exit_code, Some(1));
            assert!(!diagnostic.is_empty(), "diagnostic must not be empty");
            assert!(
                diagnostic.contains("frame-v2"),
                "diagnostic must name the unknown format: {}",
                diagnostic
            );
        }
        other => panic!("expected Decoding, got {:?}", other),
    }
}

/// A payload the decoder rejects fails with the probe's own output as the
/// diagnostic.
#[test]
fn test_corrupt_payload_fails_decode() {
    let verifier = PortabilityVerifier::with_format(BrokenJsonFormat, probe_config());
    let err = verifier.require_portable(&sample_request()).unwrap_err();

    match err {
        GantryError::Decoding { diagnostic, .. } => {
            assert!(
                diagnostic.contains("decode failed"),
                "diagnostic should carry the probe's failure line: {}",
                diagnostic
            );
        }
        other => panic!("expected Decoding, got {:?}", other),
    }
}

/// Predicate mode discards diagnostics and just answers false.
#[test]
fn test_predicate_mode_never_errors() {
    assert!(!verifier().is_portable(&LiveHandle));

    let unknown = PortabilityVerifier::with_format(FrameFormat, probe_config());
    assert!(!unknown.is_portable(&42));
}

// ── Artifact hygiene ──────────────────────────────────────────────────────────

/// No residual temp artifacts after checks, whether they pass or fail.
#[test]
fn test_zero_residual_artifacts() {
    let scratch = tempfile::tempdir().unwrap();
    let config = probe_config().with_scratch_dir(scratch.path());

    let ok = PortabilityVerifier::new(config.clone());
    assert!(ok.is_portable(&sample_request()));
    assert!(!ok.is_portable(&LiveHandle));

    let unknown = PortabilityVerifier::with_format(FrameFormat, config.clone());
    assert!(!unknown.is_portable(&42));

    let corrupt = PortabilityVerifier::with_format(BrokenJsonFormat, config);
    assert!(!corrupt.is_portable(&42));

    let residue: Vec<_> = std::fs::read_dir(scratch.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(residue.is_empty(), "residual artifacts: {:?}", residue);
}

// ── Concurrency ───────────────────────────────────────────────────────────────

/// Concurrent checks from multiple threads never collide on artifacts and
/// each returns the result matching its own input.
#[test]
fn test_concurrent_checks_are_independent() {
    let scratch = tempfile::tempdir().unwrap();
    let verifier = PortabilityVerifier::new(probe_config().with_scratch_dir(scratch.path()));

    std::thread::scope(|scope| {
        for i in 0..8u32 {
            let verifier = &verifier;
            scope.spawn(move || {
                let value = json!({ "thread": i, "payload": vec![i; 16] });
                assert!(verifier.is_portable(&value), "thread {} failed", i);

                // Odd threads also run a failing check to interleave outcomes.
                if i % 2 == 1 {
                    assert!(!verifier.is_portable(&LiveHandle));
                }
            });
        }
    });

    let residue: Vec<_> = std::fs::read_dir(scratch.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(residue.is_empty(), "residual artifacts: {:?}", residue);
}

// ── Timeout ───────────────────────────────────────────────────────────────────

/// A probe that never exits is killed at the deadline and reported as a
/// timeout, well before the test itself would hang.
#[test]
fn test_hanging_probe_times_out() {
    // `tail -f <manifest>` prints the manifest and then waits forever.
    let config = VerifierConfig::new("tail")
        .with_args(["-f"])
        .with_timeout(Duration::from_millis(300));
    let verifier = PortabilityVerifier::new(config);

    let started = Instant::now();
    let err = verifier.require_portable(&42).unwrap_err();
    let elapsed = started.elapsed();

    match err {
        GantryError::Timeout { timeout_ms } => assert_eq!(timeout_ms, 300),
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert!(
        elapsed < Duration::from_secs(5),
        "bounded wait took {:?}, should be near the 300ms deadline",
        elapsed
    );
}
