//! Work-unit states and transition records.
//!
//! `UnitState` is the status a unit carries at any point in its lifecycle.
//! `TransitionRecord` is what the runner appends to its report — one per
//! observed transition, in order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::unit::UnitId;

/// The status of a work unit.
///
/// The runner drives `Pending → Running → {Succeeded, Failed}`, with
/// `Retrying` interposed between failed attempts when the run policy allows
/// another attempt. `Failed` and `Retrying` carry the reason so observers
/// and reports can surface it without a side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    /// Not started yet.
    Pending,
    /// An attempt is executing.
    Running,
    /// The action completed and its output was accepted.
    Succeeded,
    /// The action failed and no attempts remain.
    Failed {
        /// Why the final attempt failed.
        reason: String,
    },
    /// An attempt failed but another will be made.
    Retrying {
        /// Why the attempt failed.
        reason: String,
        /// The attempt number that just failed (1-indexed).
        attempt: u32,
    },
}

impl UnitState {
    /// True for states that mark a failed or failing unit — `Failed` and
    /// `Retrying`. This is the set the failure collector matches on.
    pub fn is_failure(&self) -> bool {
        matches!(self, UnitState::Failed { .. } | UnitState::Retrying { .. })
    }

    /// True for states the runner never leaves: `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Succeeded | UnitState::Failed { .. })
    }

    /// Short lowercase label for log fields and display output.
    pub fn label(&self) -> &'static str {
        match self {
            UnitState::Pending => "pending",
            UnitState::Running => "running",
            UnitState::Succeeded => "succeeded",
            UnitState::Failed { .. } => "failed",
            UnitState::Retrying { .. } => "retrying",
        }
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An immutable record of one state transition, appended to the run report.
///
/// Every transition the runner performs — including ones an observer saw —
/// produces exactly one record. Records are never modified after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Position of this transition within the run (starts at 0).
    pub sequence: u64,
    /// The unit that transitioned.
    pub unit_id: UnitId,
    /// State before the transition.
    pub from: UnitState,
    /// State after the transition (post-observer).
    pub to: UnitState,
    /// Wall-clock time the transition was recorded (UTC).
    pub at: DateTime<Utc>,
}
