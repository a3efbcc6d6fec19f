//! Failure-collecting state observer.
//!
//! `FailureCollector` watches transitions and inserts any unit that enters
//! `Failed` or `Retrying` into a shared set. The set and its lock are
//! injected by the caller — the collector never owns process-wide state, so
//! two runners with two collectors never cross-contaminate.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use gantry_contracts::{state::UnitState, unit::{UnitId, WorkUnit}};

use crate::traits::StateObserver;

/// The shared collection a `FailureCollector` inserts into.
///
/// Callers keep a clone of the `Arc` and read the set after (or during) a
/// run. `HashSet` semantics make repeated insertion across retries
/// idempotent — a unit that retries five times appears once.
pub type SharedUnitSet = Arc<Mutex<HashSet<UnitId>>>;

/// A `StateObserver` that records failed and retrying units.
///
/// ```rust,ignore
/// use std::collections::HashSet;
/// use std::sync::{Arc, Mutex};
/// use gantry_core::{collect::FailureCollector, runner::UnitRunner};
///
/// let failed: SharedUnitSet = Arc::new(Mutex::new(HashSet::new()));
/// let mut runner = UnitRunner::new();
/// runner.register_observer(Box::new(FailureCollector::new(failed.clone())));
/// // ... run units, then inspect `failed` ...
/// ```
pub struct FailureCollector {
    collected: SharedUnitSet,
}

impl FailureCollector {
    /// Create a collector inserting into `collected`.
    pub fn new(collected: SharedUnitSet) -> Self {
        Self { collected }
    }
}

impl StateObserver for FailureCollector {
    /// Insert the unit's ID when the new state is `Failed` or `Retrying`;
    /// always return the state unchanged.
    ///
    /// A poisoned lock is logged and skipped — the collector is bookkeeping
    /// and must never alter control flow, so it does not panic or rewrite
    /// the transition even when its own storage is unusable.
    fn on_transition(&self, unit: &WorkUnit, _old: &UnitState, new: UnitState) -> UnitState {
        if new.is_failure() {
            match self.collected.lock() {
                Ok(mut set) => {
                    debug!(unit_id = %unit.id, state = %new, "collecting failing unit");
                    set.insert(unit.id.clone());
                }
                Err(_) => {
                    warn!(
                        unit_id = %unit.id,
                        "failure collector lock poisoned; dropping entry"
                    );
                }
            }
        }
        new
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
