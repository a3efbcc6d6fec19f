//! # gantry-portability
//!
//! Cross-process portability checks for the gantry runtime.
//!
//! ## Overview
//!
//! A value is *portable* when it can be encoded in the current process and
//! reconstructed by an independent, freshly started one — the practical bar
//! for shipping a computation or its inputs/outputs to a remote worker.
//! In-process round-tripping is not a proxy for this: the failures that
//! matter only appear when the receiving process lacks the sender's context.
//!
//! Per check, the verifier writes a payload artifact and a decode manifest
//! (both uniquely named temp files), spawns the `gantry-decode` probe with
//! the manifest path, waits with a bound, and classifies the exit code.
//! Artifacts are removed on every exit path.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gantry_portability::{config::VerifierConfig, verifier::PortabilityVerifier};
//!
//! let verifier = PortabilityVerifier::new(VerifierConfig::default());
//!
//! if !verifier.is_portable(&task_inputs) {
//!     // diagnostic mode surfaces the probe's output verbatim
//!     verifier.require_portable(&task_inputs)?;
//! }
//! ```

pub mod config;
pub mod format;
pub mod manifest;
pub mod verifier;

pub use config::VerifierConfig;
pub use format::{DecoderRegistry, JsonFormat, PayloadDecoder, PayloadFormat};
pub use manifest::DecodeManifest;
pub use verifier::PortabilityVerifier;
