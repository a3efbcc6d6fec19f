//! Verifier configuration, loadable from TOML.
//!
//! Configuration is explicit and per-verifier — nothing here is process
//! global. The TOML schema mirrors the struct fields:
//!
//! ```toml
//! program = "/opt/gantry/bin/gantry-decode"
//! args = []
//! timeout_ms = 10000
//! scratch_dir = "/var/tmp/gantry"
//! ```
//!
//! Every field is optional; omitted fields take the defaults described on
//! `VerifierConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use gantry_contracts::error::{GantryError, GantryResult};

/// Environment variable overriding the default decoder program path.
pub const DECODER_ENV: &str = "GANTRY_DECODER";

/// File name of the decode probe shipped with the workspace.
pub const DECODER_PROGRAM: &str = "gantry-decode";

/// Default bounded wait on the decoder child.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// How a `PortabilityVerifier` finds and bounds its decode probe.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// The decode-probe program to spawn.
    pub program: PathBuf,

    /// Arguments placed before the manifest path (e.g. a wrapper's own
    /// flags when `program` is a container or sandbox runner). The manifest
    /// path is always appended as the final argument.
    pub args: Vec<String>,

    /// Bounded wait on the child; on expiry the child is killed and the
    /// check fails with `GantryError::Timeout`.
    pub timeout: Duration,

    /// Directory for temp artifacts. `None` uses the platform temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl VerifierConfig {
    /// Config for the given probe program with default timeout and scratch.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            scratch_dir: None,
        }
    }

    /// Replace the bounded wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set arguments placed before the manifest path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Place temp artifacts in `dir` instead of the platform temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Parse `s` as TOML and build a `VerifierConfig`.
    ///
    /// Returns `GantryError::ConfigError` if the TOML is malformed or does
    /// not match the expected schema.
    pub fn from_toml_str(s: &str) -> GantryResult<Self> {
        let raw: RawConfig = toml::from_str(s).map_err(|e| GantryError::ConfigError {
            reason: format!("failed to parse verifier config TOML: {}", e),
        })?;

        Ok(Self {
            program: raw.program.unwrap_or_else(default_decoder_program),
            args: raw.args,
            timeout: Duration::from_millis(raw.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            scratch_dir: raw.scratch_dir,
        })
    }

    /// Read the file at `path` and parse it as TOML verifier configuration.
    pub fn from_file(path: &Path) -> GantryResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GantryError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::new(default_decoder_program())
    }
}

/// Locate the decode probe when the caller does not name one.
///
/// Resolution order:
/// 1. The `GANTRY_DECODER` environment variable.
/// 2. A `gantry-decode` binary next to the current executable (the layout
///    `cargo install` and most deployments produce).
/// 3. The bare program name, resolved through `PATH` at spawn time.
pub fn default_decoder_program() -> PathBuf {
    if let Ok(path) = std::env::var(DECODER_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(DECODER_PROGRAM);
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from(DECODER_PROGRAM)
}

/// The on-disk TOML schema; all fields optional.
#[derive(Debug, Deserialize)]
struct RawConfig {
    program: Option<PathBuf>,
    #[serde(default)]
    args: Vec<String>,
    timeout_ms: Option<u64>,
    scratch_dir: Option<PathBuf>,
}

// ── Tests ────────────────────────────────────────────────────────────────────
