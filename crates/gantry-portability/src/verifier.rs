//! The portability verifier: encode here, decode in a fresh process.
//!
//! Round-tripping a value inside one process proves very little — the
//! interesting failures only show up when the receiving process lacks the
//! originating process's context (unknown formats, corrupted artifacts,
//! encoder state that never made it into the payload). The verifier
//! therefore spawns a genuinely independent decode probe per check:
//!
//!   encode → payload artifact → manifest artifact → spawn probe →
//!   bounded wait → classify exit code + captured output
//!
//! All temp artifacts are RAII-owned `NamedTempFile`s, so they are removed
//! on every exit path — success, failure, timeout, or panic. The candidate
//! value is only ever borrowed and never mutated.

use std::io::Write;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use gantry_contracts::{
    error::{GantryError, GantryResult},
    portability::CheckOutcome,
};

use crate::config::VerifierConfig;
use crate::format::{JsonFormat, PayloadFormat};
use crate::manifest::DecodeManifest;

/// How often the bounded wait polls the child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Checks whether values survive encode-here / decode-in-a-fresh-process.
///
/// One verifier can serve many calls, including concurrently from multiple
/// threads — each call allocates its own uniquely named artifacts and its
/// own child process.
///
/// ```rust,ignore
/// use gantry_portability::{config::VerifierConfig, verifier::PortabilityVerifier};
///
/// let verifier = PortabilityVerifier::new(VerifierConfig::default());
/// assert!(verifier.is_portable(&42));
/// verifier.require_portable(&my_task_inputs)?; // Err carries the diagnostic
/// ```
pub struct PortabilityVerifier<F: PayloadFormat = JsonFormat> {
    format: F,
    config: VerifierConfig,
}

impl PortabilityVerifier<JsonFormat> {
    /// A verifier using the built-in JSON format.
    pub fn new(config: VerifierConfig) -> Self {
        Self::with_format(JsonFormat, config)
    }
}

impl<F: PayloadFormat> PortabilityVerifier<F> {
    /// A verifier using a caller-supplied payload format.
    ///
    /// The probe named in `config` must know how to decode `format` — a
    /// format the probe has never heard of fails every check, by design.
    pub fn with_format(format: F, config: VerifierConfig) -> Self {
        Self { format, config }
    }

    /// Run the full check and return the tagged outcome.
    ///
    /// This never returns an error: every failure class — encoding,
    /// artifact I/O, spawn, timeout, decode — collapses into
    /// `CheckOutcome::Failed` carrying the underlying error.
    pub fn check<T: Serialize + ?Sized>(&self, value: &T) -> CheckOutcome {
        match self.run_check(value) {
            Ok(()) => CheckOutcome::Verified,
            Err(err) => CheckOutcome::Failed(err),
        }
    }

    /// Predicate mode: `true` iff the value verified. Diagnostics are
    /// discarded; this never panics and never errors.
    pub fn is_portable<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        self.check(value).is_verified()
    }

    /// Diagnostic mode: `Err` carries the underlying failure verbatim,
    /// including the probe's combined stdout/stderr for decode failures.
    pub fn require_portable<T: Serialize + ?Sized>(&self, value: &T) -> GantryResult<()> {
        self.check(value).into_result()
    }

    // ── Check pipeline ────────────────────────────────────────────────────────

    fn run_check<T: Serialize + ?Sized>(&self, value: &T) -> GantryResult<()> {
        // Step 1: encode. Failing here means the value graph itself cannot
        // be serialized; no artifacts have been created yet.
        let payload = self.format.encode(value)?;

        // Step 2: persist payload + manifest to uniquely named artifacts.
        // The NamedTempFile handles own the paths; dropping them (on any
        // exit from this function) removes the files.
        let mut payload_file = self.temp_artifact("gantry-payload-")?;
        write_artifact(&mut payload_file, &payload)?;

        let manifest = DecodeManifest::for_payload(
            self.format.name(),
            payload_file.path(),
            &payload,
        );
        let mut manifest_file = self.temp_artifact("gantry-manifest-")?;
        write_artifact(&mut manifest_file, &manifest.to_json()?)?;

        // Step 3: a third artifact captures the child's combined output.
        // Both stdio streams get a duplicated handle to the same file, so
        // ordering between them is preserved the way a terminal would see it.
        let capture_file = self.temp_artifact("gantry-capture-")?;
        let capture_out = clone_capture_handle(&capture_file)?;
        let capture_err = clone_capture_handle(&capture_file)?;

        debug!(
            program = %self.config.program.display(),
            format = self.format.name(),
            payload_len = payload.len(),
            "spawning decode probe"
        );

        // Step 4: spawn the probe as a fresh OS process. Nothing is shared
        // with it beyond the artifacts on disk.
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(manifest_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::from(capture_out))
            .stderr(Stdio::from(capture_err))
            .spawn()
            .map_err(|e| GantryError::ProcessSpawn {
                program: self.config.program.display().to_string(),
                reason: e.to_string(),
            })?;

        // Step 5: bounded wait, the only blocking point in the check.
        let status = self.wait_bounded(&mut child)?;

        // Step 6: classify.
        let diagnostic = read_capture(&capture_file);
        if status.success() {
            debug!(format = self.format.name(), "portability verified");
            Ok(())
        } else {
            warn!(
                exit_code = ?status.code(),
                diagnostic = %diagnostic,
                "decode probe rejected payload"
            );
            Err(GantryError::Decoding {
                exit_code: status.code(),
                diagnostic,
            })
        }
    }

    /// Poll the child until it exits or the configured deadline passes.
    ///
    /// On deadline the child is killed and reaped before the error returns,
    /// so no child ever outlives its check.
    fn wait_bounded(&self, child: &mut Child) -> GantryResult<ExitStatus> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),

                Ok(None) => {
                    if Instant::now() >= deadline {
                        let timeout_ms = self.config.timeout.as_millis() as u64;
                        warn!(timeout_ms, "decode probe exceeded bounded wait; killing");
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(GantryError::Timeout { timeout_ms });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }

                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GantryError::ProcessSpawn {
                        program: self.config.program.display().to_string(),
                        reason: format!("wait on child failed: {}", e),
                    });
                }
            }
        }
    }

    /// Allocate a uniquely named temp artifact, honoring `scratch_dir`.
    fn temp_artifact(&self, prefix: &str) -> GantryResult<NamedTempFile> {
        let mut builder = Builder::new();
        builder.prefix(prefix);

        let created = match &self.config.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };

        created.map_err(|e| GantryError::ArtifactIo {
            reason: format!("failed to create temp artifact '{}*': {}", prefix, e),
        })
    }
}

// ── Artifact helpers ──────────────────────────────────────────────────────────

fn write_artifact(file: &mut NamedTempFile, bytes: &[u8]) -> GantryResult<()> {
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .map_err(|e| GantryError::ArtifactIo {
            reason: format!("failed to write artifact '{}': {}", file.path().display(), e),
        })
}

fn clone_capture_handle(file: &NamedTempFile) -> GantryResult<std::fs::File> {
    file.as_file().try_clone().map_err(|e| GantryError::ArtifactIo {
        reason: format!("failed to duplicate capture handle: {}", e),
    })
}

/// Read whatever the child wrote, lossily: the diagnostic is for humans
/// and error messages, and a child can emit arbitrary bytes.
fn read_capture(file: &NamedTempFile) -> String {
    match std::fs::read(file.path()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim_end().to_string(),
        Err(e) => format!("(failed to read captured output: {})", e),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
