//! The decode manifest: the fixed-schema handoff between verifier and probe.
//!
//! Instead of generating program text, the verifier writes a small JSON
//! document describing the payload artifact; the probe binary is fixed and
//! parameterized only by the manifest path it receives on its command line.
//! There is no interpolated code anywhere in the handoff.
//!
//! The manifest commits to the payload with a SHA-256 digest and a byte
//! length, which the probe re-checks before decoding. A truncated or
//! corrupted artifact therefore fails loudly as an integrity error instead
//! of producing a misleading decode result.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use gantry_contracts::error::{GantryError, GantryResult};

/// Everything the decode probe needs to attempt reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeManifest {
    /// Name of the payload format (selects the probe-side decoder).
    pub format: String,
    /// Absolute path of the payload artifact.
    pub payload_path: PathBuf,
    /// Exact byte length of the payload artifact.
    pub payload_len: u64,
    /// Lowercase SHA-256 hex digest of the payload bytes.
    pub payload_sha256: String,
}

impl DecodeManifest {
    /// Build a manifest for `payload` as written to `payload_path`.
    pub fn for_payload(
        format: impl Into<String>,
        payload_path: impl Into<PathBuf>,
        payload: &[u8],
    ) -> Self {
        Self {
            format: format.into(),
            payload_path: payload_path.into(),
            payload_len: payload.len() as u64,
            payload_sha256: Self::digest(payload),
        }
    }

    /// Compute the lowercase SHA-256 hex digest of `bytes`.
    pub fn digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Check `payload` against the recorded length and digest.
    ///
    /// Returns `GantryError::Decoding` on mismatch — an artifact that does
    /// not match its manifest cannot be meaningfully reconstructed.
    pub fn verify_payload(&self, payload: &[u8]) -> GantryResult<()> {
        if payload.len() as u64 != self.payload_len {
            return Err(GantryError::Decoding {
                exit_code: None,
                diagnostic: format!(
                    "payload length mismatch: manifest says {} bytes, artifact has {}",
                    self.payload_len,
                    payload.len()
                ),
            });
        }

        let actual = Self::digest(payload);
        if actual != self.payload_sha256 {
            return Err(GantryError::Decoding {
                exit_code: None,
                diagnostic: format!(
                    "payload digest mismatch: manifest says {}, artifact hashes to {}",
                    self.payload_sha256, actual
                ),
            });
        }

        Ok(())
    }

    /// Serialize the manifest to the JSON bytes written to its artifact.
    pub fn to_json(&self) -> GantryResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| GantryError::ArtifactIo {
            reason: format!("failed to serialize decode manifest: {}", e),
        })
    }

    /// Read and parse a manifest artifact.
    pub fn from_file(path: &Path) -> GantryResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| GantryError::ArtifactIo {
            reason: format!("failed to read manifest '{}': {}", path.display(), e),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| GantryError::ArtifactIo {
            reason: format!("manifest '{}' is not valid JSON: {}", path.display(), e),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
