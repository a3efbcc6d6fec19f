//! gantry-decode — the portability decode probe.
//!
//! Runs as a fully independent process: no shared memory, no inherited
//! in-process state, only the manifest path on its command line. It reads
//! the manifest, loads the payload artifact, re-checks length and digest,
//! and decodes with the matching registered decoder.
//!
//! Exit code 0 means the payload reconstructed cleanly; any failure is
//! printed (the verifier captures combined stdout/stderr as the diagnostic)
//! and the process exits 1.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gantry_contracts::error::{GantryError, GantryResult};
use gantry_portability::format::DecoderRegistry;
use gantry_portability::manifest::DecodeManifest;

/// Decode probe: reconstructs a payload artifact in a fresh process.
#[derive(Parser)]
#[command(
    name = "gantry-decode",
    about = "Reconstructs a gantry payload artifact in a fresh process"
)]
struct Cli {
    /// Path to the decode manifest written by the verifier.
    manifest: PathBuf,
}

fn main() {
    // Diagnostics go to stderr; the verifier captures it either way.
    // Set RUST_LOG=debug for verbose output when running by hand.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match run(&cli.manifest) {
        Ok(format) => {
            println!("decode ok ({})", format);
        }
        Err(e) => {
            eprintln!("decode failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// The whole probe: manifest → payload → integrity check → decode.
fn run(manifest_path: &Path) -> GantryResult<String> {
    let manifest = DecodeManifest::from_file(manifest_path)?;

    let payload = std::fs::read(&manifest.payload_path).map_err(|e| GantryError::ArtifactIo {
        reason: format!(
            "failed to read payload '{}': {}",
            manifest.payload_path.display(),
            e
        ),
    })?;

    manifest.verify_payload(&payload)?;

    DecoderRegistry::with_builtin().decode(&manifest.format, &payload)?;

    Ok(manifest.format)
}
