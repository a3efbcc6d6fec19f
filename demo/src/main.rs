//! gantry — Demo CLI
//!
//! Exercises the real gantry components end to end: the portability
//! verifier against the `gantry-decode` probe, and the unit runner with a
//! failure collector attached.
//!
//! Usage:
//!   cargo run -p demo -- check '{"a": [1, 2, 3]}'
//!   cargo run -p demo -- check 42 --timeout-ms 2000
//!   cargo run -p demo -- run-units
//!   cargo run -p demo -- run-units --propagate

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gantry_contracts::{
    error::{GantryError, GantryResult},
    portability::CheckOutcome,
    unit::WorkUnit,
};
use gantry_core::{
    collect::{FailureCollector, SharedUnitSet},
    runner::{RunPolicy, UnitRunner},
    traits::UnitAction,
};
use gantry_portability::{config::VerifierConfig, verifier::PortabilityVerifier};

// ── CLI definition ────────────────────────────────────────────────────────────

/// gantry — work-unit execution seam and cross-process portability checks.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "gantry portability and unit-runner demo",
    long_about = "Runs gantry demo flows: portability checks against a fresh\n\
                  decode process, and work units driven through the runner\n\
                  with a failure collector attached."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a JSON value can be reconstructed in a fresh process.
    Check {
        /// The value to test, as JSON text (e.g. '{"a": [1, 2, 3]}').
        value: String,

        /// Decode probe to spawn. Defaults to $GANTRY_DECODER, then a
        /// gantry-decode binary next to this executable.
        #[arg(long)]
        decoder: Option<PathBuf>,

        /// Bounded wait on the probe, in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Load verifier configuration from a TOML file; flags override it.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run demo work units with a failure collector attached.
    RunUnits {
        /// Propagate action errors instead of trapping them into Failed states.
        #[arg(long)]
        propagate: bool,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::Check {
            value,
            decoder,
            timeout_ms,
            config,
        } => run_check(&value, decoder, timeout_ms, config),
        Command::RunUnits { propagate } => run_units(propagate),
    };

    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Portability check ─────────────────────────────────────────────────────────

fn run_check(
    value: &str,
    decoder: Option<PathBuf>,
    timeout_ms: Option<u64>,
    config: Option<PathBuf>,
) -> GantryResult<()> {
    let value: serde_json::Value =
        serde_json::from_str(value).map_err(|e| GantryError::ConfigError {
            reason: format!("value is not valid JSON: {}", e),
        })?;

    let mut config = match config {
        Some(path) => VerifierConfig::from_file(&path)?,
        None => VerifierConfig::default(),
    };
    if let Some(program) = decoder {
        config.program = program;
    }
    if let Some(ms) = timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }

    println!("Probe:   {}", config.program.display());
    println!("Timeout: {} ms", config.timeout.as_millis());
    println!();

    let verifier = PortabilityVerifier::new(config);
    match verifier.check(&value) {
        CheckOutcome::Verified => {
            println!("VERIFIED — the value reconstructs in a fresh process.");
            Ok(())
        }
        CheckOutcome::Failed(err) => {
            println!("FAILED — the value cannot be shipped as-is.");
            println!();
            println!("  {}", err);
            std::process::exit(1);
        }
    }
}

// ── Unit runner demo ──────────────────────────────────────────────────────────

/// Succeeds immediately.
struct FetchInvoices;

impl UnitAction for FetchInvoices {
    fn execute(&self, _unit: &WorkUnit) -> GantryResult<serde_json::Value> {
        Ok(serde_json::json!({ "invoices": 17 }))
    }
}

/// Fails twice, then succeeds — shows Retrying transitions.
struct ResizeBatch {
    calls: Mutex<u32>,
}

impl UnitAction for ResizeBatch {
    fn execute(&self, unit: &WorkUnit) -> GantryResult<serde_json::Value> {
        let mut calls = self.calls.lock().expect("demo action lock poisoned");
        *calls += 1;
        if *calls <= 2 {
            Err(GantryError::ActionFailed {
                unit: unit.name.clone(),
                reason: format!("worker pool exhausted (attempt {})", *calls),
            })
        } else {
            Ok(serde_json::json!({ "resized": 128 }))
        }
    }
}

/// Never succeeds.
struct SendWebhooks;

impl UnitAction for SendWebhooks {
    fn execute(&self, unit: &WorkUnit) -> GantryResult<serde_json::Value> {
        Err(GantryError::ActionFailed {
            unit: unit.name.clone(),
            reason: "endpoint returned 503".to_string(),
        })
    }
}

fn run_units(propagate: bool) -> GantryResult<()> {
    let failed: SharedUnitSet = Arc::new(Mutex::new(HashSet::new()));
    let mut runner = UnitRunner::new();
    runner.register_observer(Box::new(FailureCollector::new(failed.clone())));

    let policy = RunPolicy {
        propagate_errors: propagate,
        max_attempts: 3,
    };

    let units: Vec<(WorkUnit, Box<dyn UnitAction>)> = vec![
        (WorkUnit::new("fetch-invoices"), Box::new(FetchInvoices)),
        (
            WorkUnit::new("resize-batch"),
            Box::new(ResizeBatch { calls: Mutex::new(0) }),
        ),
        (WorkUnit::new("send-webhooks"), Box::new(SendWebhooks)),
    ];

    let names: HashMap<_, _> = units
        .iter()
        .map(|(unit, _)| (unit.id.clone(), unit.name.clone()))
        .collect();

    for (unit, action) in &units {
        info!(unit = %unit.name, "running demo unit");
        println!("── {} ──", unit.name);

        // With --propagate, the first action error surfaces here and the
        // demo exits through main's error path — the debugging behavior.
        let report = runner.run(unit, action.as_ref(), &policy)?;

        for record in &report.transitions {
            println!("  [{}] {} -> {}", record.sequence, record.from, record.to);
        }
        println!("  final: {}", report.final_state);
        println!();
    }

    let failed = failed.lock().expect("failure set lock poisoned");
    if failed.is_empty() {
        println!("No units failed or retried.");
    } else {
        let mut collected: Vec<&str> = failed
            .iter()
            .filter_map(|id| names.get(id).map(String::as_str))
            .collect();
        collected.sort_unstable();
        println!("Units that failed or retried: {}", collected.join(", "));
    }

    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("gantry — portability & unit-runner demo");
    println!("=======================================");
    println!();
}
