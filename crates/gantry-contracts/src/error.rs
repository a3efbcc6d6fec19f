//! Runtime error types for the gantry crates.
//!
//! All fallible operations in gantry return `GantryResult<T>`. Error
//! variants carry enough context to diagnose a failed portability check or
//! unit run without re-running it.

use thiserror::Error;

/// The unified error type for the gantry runtime.
#[derive(Debug, Error)]
pub enum GantryError {
    /// The value graph could not be serialized at all.
    #[error("payload encoding failed: {reason}")]
    Encoding { reason: String },

    /// The payload failed to decode in the independent process.
    ///
    /// `diagnostic` holds the child's combined stdout and stderr verbatim,
    /// which includes the decode error the probe printed before exiting.
    #[error("payload failed to decode in a fresh process (exit code {exit_code:?}): {diagnostic}")]
    Decoding {
        exit_code: Option<i32>,
        diagnostic: String,
    },

    /// The decoder child process could not be started or waited on.
    #[error("failed to run decoder process '{program}': {reason}")]
    ProcessSpawn { program: String, reason: String },

    /// The decoder child exceeded the bounded wait and was killed.
    #[error("portability check timed out after {timeout_ms} ms waiting for the decoder process")]
    Timeout { timeout_ms: u64 },

    /// A temporary artifact could not be created, written, or read.
    #[error("artifact I/O failed: {reason}")]
    ArtifactIo { reason: String },

    /// A unit action returned an error during execution.
    ///
    /// With the default run policy this is converted into a `Failed` state;
    /// with `propagate_errors` set it is returned to the caller as-is.
    #[error("unit '{unit}' action failed: {reason}")]
    ActionFailed { unit: String, reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

/// Convenience alias used throughout the gantry crates.
pub type GantryResult<T> = Result<T, GantryError>;
