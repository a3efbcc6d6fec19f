//! Payload formats: the pluggable serialization seam.
//!
//! The verifier and the decode probe run in different processes, so the
//! format is split into two halves:
//!
//! - `PayloadFormat` — the encode half, generic over the value type, used
//!   in the calling process.
//! - `PayloadDecoder` — the object-safe decode half, held by the probe in
//!   a `DecoderRegistry` keyed by format name.
//!
//! A format name recorded in the manifest but absent from the probe's
//! registry fails the check — which is precisely the class of failure the
//! verifier exists to surface: the receiving process lacks something the
//! originating process had.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use gantry_contracts::error::{GantryError, GantryResult};

/// The encode half of a payload format, used in the calling process.
///
/// Implementations must be deterministic per value: the bytes written to
/// the payload artifact are also what the manifest digest commits to.
pub trait PayloadFormat {
    /// Stable name recorded in the decode manifest. The probe uses it to
    /// select the matching decoder.
    fn name(&self) -> &'static str;

    /// Encode `value` into the format's byte representation.
    ///
    /// Returns `GantryError::Encoding` when the value graph cannot be
    /// serialized (e.g. a `Serialize` impl guarding a live native resource).
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> GantryResult<Vec<u8>>;
}

/// The decode half of a payload format, object-safe so the probe binary can
/// hold a registry of them.
pub trait PayloadDecoder: Send + Sync {
    /// Must match the `PayloadFormat::name` of the encode half.
    fn name(&self) -> &'static str;

    /// Decode `bytes` and discard the result.
    ///
    /// A successful return means the payload reconstructs cleanly in this
    /// process; the decoded value itself is not needed.
    fn decode(&self, bytes: &[u8]) -> GantryResult<()>;
}

/// The built-in JSON format, implementing both halves via `serde_json`.
///
/// JSON is self-describing, so the decode half needs no type information —
/// it parses the payload into a `serde_json::Value` and discards it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl JsonFormat {
    /// The name recorded in manifests for this format.
    pub const NAME: &'static str = "json";
}

impl PayloadFormat for JsonFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> GantryResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| GantryError::Encoding {
            reason: e.to_string(),
        })
    }
}

impl PayloadDecoder for JsonFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn decode(&self, bytes: &[u8]) -> GantryResult<()> {
        let _: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| GantryError::Decoding {
                exit_code: None,
                diagnostic: e.to_string(),
            })?;
        Ok(())
    }
}

/// Name → decoder map held by the decode probe.
///
/// Hosts embedding the probe can register additional decoders at startup;
/// the stock binary only knows the built-ins. Registering the same name
/// twice replaces the previous decoder.
pub struct DecoderRegistry {
    decoders: HashMap<&'static str, Box<dyn PayloadDecoder>>,
}

impl DecoderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Create a registry with the built-in formats registered (`json`).
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(JsonFormat));
        registry
    }

    /// Register a decoder under its own name.
    pub fn register(&mut self, decoder: Box<dyn PayloadDecoder>) {
        self.decoders.insert(decoder.name(), decoder);
    }

    /// Decode `bytes` with the decoder registered under `format`.
    ///
    /// An unknown format name is a decode failure: the payload cannot be
    /// reconstructed by a process that does not know its encoding.
    pub fn decode(&self, format: &str, bytes: &[u8]) -> GantryResult<()> {
        match self.decoders.get(format) {
            Some(decoder) => {
                debug!(format, payload_len = bytes.len(), "decoding payload");
                decoder.decode(bytes)
            }
            None => Err(GantryError::Decoding {
                exit_code: None,
                diagnostic: format!("no decoder registered for payload format '{}'", format),
            }),
        }
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
