//! The unit runner: drives one work unit through its state machine.
//!
//! The runner enforces the transition order:
//!
//!   Pending → Running → [Retrying → Running]* → {Succeeded, Failed}
//!
//! Every transition is threaded through every registered `StateObserver`
//! in registration order and appended to the `RunReport`. What an action
//! error means is decided here, by the `RunPolicy` passed to `run()` —
//! never by ambient state: with `propagate_errors` unset the error is
//! trapped into a `Failed` (or `Retrying`) state; with it set the error
//! returns to the caller before any failure-state conversion happens.

use chrono::Utc;
use tracing::{debug, warn};

use gantry_contracts::{
    error::GantryResult,
    state::{TransitionRecord, UnitState},
    unit::WorkUnit,
};

use crate::traits::{StateObserver, UnitAction};

/// Per-call execution policy.
///
/// This is explicit, call-scoped configuration: two concurrent `run()`
/// calls with different policies never interfere, because nothing here is
/// process-global.
#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// When true, an action error is returned to the caller as `Err`
    /// instead of being converted into a `Failed` state. Intended for
    /// local debugging, where trapping the error hides the interesting
    /// part.
    pub propagate_errors: bool,

    /// Maximum number of attempts before the unit is marked `Failed`.
    /// Values below 1 are treated as 1. Attempts re-execute inline —
    /// backoff and scheduling belong to the surrounding framework.
    pub max_attempts: u32,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            propagate_errors: false,
            max_attempts: 1,
        }
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    /// The state the unit ended in (`Succeeded` or `Failed`).
    pub final_state: UnitState,
    /// The action's output payload, present only on success.
    pub output: Option<serde_json::Value>,
    /// Every transition performed during the run, in order.
    pub transitions: Vec<TransitionRecord>,
}

/// Drives a single work unit through its lifecycle, with observers.
///
/// Construct one, register observers, then call `run()` per unit. The
/// runner holds no per-run state, so one instance can serve many calls.
pub struct UnitRunner {
    observers: Vec<Box<dyn StateObserver>>,
}

impl UnitRunner {
    /// Create a runner with no observers registered.
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Register an observer. Observers are invoked in registration order
    /// on every subsequent transition.
    pub fn register_observer(&mut self, observer: Box<dyn StateObserver>) {
        self.observers.push(observer);
    }

    /// Run `unit` to completion under `policy`.
    ///
    /// # Returns
    ///
    /// - `Ok(report)` when the run reached a terminal state — including
    ///   `Failed`, which is a normal outcome under the default policy.
    /// - `Err(e)` only when `policy.propagate_errors` is set and the action
    ///   returned an error. The error is surfaced before any failure-state
    ///   conversion, so observers see no synthetic `Failed` transition in
    ///   that mode.
    pub fn run(
        &self,
        unit: &WorkUnit,
        action: &dyn UnitAction,
        policy: &RunPolicy,
    ) -> GantryResult<RunReport> {
        let max_attempts = policy.max_attempts.max(1);

        debug!(
            unit_id = %unit.id,
            unit = %unit.name,
            max_attempts,
            propagate_errors = policy.propagate_errors,
            "unit run starting"
        );

        let mut transitions: Vec<TransitionRecord> = Vec::new();
        let mut state = self.apply(unit, UnitState::Pending, UnitState::Running, &mut transitions);

        let mut attempt: u32 = 1;
        let output = loop {
            match action.execute(unit) {
                Ok(output) => break Some(output),

                Err(err) => {
                    if policy.propagate_errors {
                        // Debug mode: hand the error to the caller instead of
                        // trapping it into a failure state.
                        warn!(
                            unit_id = %unit.id,
                            attempt,
                            error = %err,
                            "action failed; propagating per run policy"
                        );
                        return Err(err);
                    }

                    let reason = err.to_string();
                    if attempt < max_attempts {
                        warn!(
                            unit_id = %unit.id,
                            attempt,
                            reason = %reason,
                            "attempt failed, retrying"
                        );
                        state = self.apply(
                            unit,
                            state,
                            UnitState::Retrying { reason, attempt },
                            &mut transitions,
                        );
                        state = self.apply(unit, state, UnitState::Running, &mut transitions);
                        attempt += 1;
                    } else {
                        warn!(
                            unit_id = %unit.id,
                            attempt,
                            reason = %reason,
                            "attempt failed, no attempts remain"
                        );
                        state = self.apply(
                            unit,
                            state,
                            UnitState::Failed { reason },
                            &mut transitions,
                        );
                        break None;
                    }
                }
            }
        };

        if output.is_some() {
            state = self.apply(unit, state, UnitState::Succeeded, &mut transitions);
        }

        debug!(
            unit_id = %unit.id,
            final_state = %state,
            transition_count = transitions.len(),
            "unit run finished"
        );

        Ok(RunReport {
            final_state: state,
            output,
            transitions,
        })
    }

    /// Perform one transition: thread the new state through every observer,
    /// record it, and return the (post-observer) state.
    fn apply(
        &self,
        unit: &WorkUnit,
        from: UnitState,
        to: UnitState,
        transitions: &mut Vec<TransitionRecord>,
    ) -> UnitState {
        let mut next = to;
        for observer in &self.observers {
            next = observer.on_transition(unit, &from, next);
        }

        debug!(unit_id = %unit.id, from = %from, to = %next, "state transition");

        transitions.push(TransitionRecord {
            sequence: transitions.len() as u64,
            unit_id: unit.id.clone(),
            from,
            to: next.clone(),
            at: Utc::now(),
        });

        next
    }
}

impl Default for UnitRunner {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use gantry_contracts::{
        error::{GantryError, GantryResult},
        state::UnitState,
        unit::WorkUnit,
    };

    use crate::traits::{StateObserver, UnitAction};

    use super::{RunPolicy, UnitRunner};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// An action that always succeeds with a fixed payload.
    struct SucceedingAction;

    impl UnitAction for SucceedingAction {
        fn execute(&self, _unit: &WorkUnit) -> GantryResult<serde_json::Value> {
            Ok(json!({ "rows": 42 }))
        }
    }

    /// An action that fails the first `failures` attempts, then succeeds.
    struct FlakyAction {
        failures: u32,
        calls: Arc<Mutex<u32>>,
    }

    impl FlakyAction {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: Arc::new(Mutex::new(0)),
            }
        }
    }

    impl UnitAction for FlakyAction {
        fn execute(&self, unit: &WorkUnit) -> GantryResult<serde_json::Value> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= self.failures {
                Err(GantryError::ActionFailed {
                    unit: unit.name.clone(),
                    reason: format!("transient failure #{}", *calls),
                })
            } else {
                Ok(json!({ "recovered": true }))
            }
        }
    }

    /// An observer that records each transition as (from, to) labels and
    /// returns the state unchanged, per the StateObserver contract.
    struct RecordingObserver {
        seen: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl StateObserver for RecordingObserver {
        fn on_transition(&self, _unit: &WorkUnit, old: &UnitState, new: UnitState) -> UnitState {
            self.seen
                .lock()
                .unwrap()
                .push((old.label().to_string(), new.label().to_string()));
            new
        }
    }

    fn labels(report: &super::RunReport) -> Vec<(String, String)> {
        report
            .transitions
            .iter()
            .map(|t| (t.from.label().to_string(), t.to.label().to_string()))
            .collect()
    }

    // ── Test cases ───────────────────────────────────────────────────────────

    /// A successful run walks Pending → Running → Succeeded and carries the
    /// action's output in the report.
    #[test]
    fn test_successful_run() {
        let runner = UnitRunner::new();
        let unit = WorkUnit::new("happy-path");

        let report = runner
            .run(&unit, &SucceedingAction, &RunPolicy::default())
            .unwrap();

        assert_eq!(report.final_state, UnitState::Succeeded);
        assert_eq!(report.output, Some(json!({ "rows": 42 })));
        assert_eq!(
            labels(&report),
            vec![
                ("pending".to_string(), "running".to_string()),
                ("running".to_string(), "succeeded".to_string()),
            ]
        );
    }

    /// Under the default policy, an action error is trapped into a Failed
    /// state and run() still returns Ok.
    #[test]
    fn test_error_trapped_into_failed_state() {
        let runner = UnitRunner::new();
        let unit = WorkUnit::new("doomed");
        let action = FlakyAction::new(u32::MAX);

        let report = runner.run(&unit, &action, &RunPolicy::default()).unwrap();

        match &report.final_state {
            UnitState::Failed { reason } => {
                assert!(reason.contains("transient failure #1"), "reason: {}", reason);
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(report.output.is_none());
    }

    /// With propagate_errors set, the action error is returned as Err and no
    /// failure-state transition ever happens — observers only see the unit
    /// start running.
    #[test]
    fn test_propagate_errors_returns_err() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut runner = UnitRunner::new();
        runner.register_observer(Box::new(RecordingObserver { seen: seen.clone() }));

        let unit = WorkUnit::new("debuggable");
        let action = FlakyAction::new(u32::MAX);
        let policy = RunPolicy {
            propagate_errors: true,
            ..RunPolicy::default()
        };

        let result = runner.run(&unit, &action, &policy);

        match result {
            Err(GantryError::ActionFailed { unit: name, reason }) => {
                assert_eq!(name, "debuggable");
                assert!(reason.contains("transient failure"));
            }
            other => panic!("expected ActionFailed, got {:?}", other),
        }

        // Only the Pending → Running transition was observed; the error
        // propagated before any Failed/Retrying conversion.
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("pending".to_string(), "running".to_string())]);
    }

    /// With attempts remaining, a failed attempt transitions through
    /// Retrying and back to Running, then the retry can succeed.
    #[test]
    fn test_retry_then_succeed() {
        let runner = UnitRunner::new();
        let unit = WorkUnit::new("flaky");
        let action = FlakyAction::new(2);
        let policy = RunPolicy {
            max_attempts: 3,
            ..RunPolicy::default()
        };

        let report = runner.run(&unit, &action, &policy).unwrap();

        assert_eq!(report.final_state, UnitState::Succeeded);
        assert_eq!(report.output, Some(json!({ "recovered": true })));
        assert_eq!(
            labels(&report),
            vec![
                ("pending".to_string(), "running".to_string()),
                ("running".to_string(), "retrying".to_string()),
                ("retrying".to_string(), "running".to_string()),
                ("running".to_string(), "retrying".to_string()),
                ("retrying".to_string(), "running".to_string()),
                ("running".to_string(), "succeeded".to_string()),
            ]
        );

        // The Retrying records carry 1-indexed attempt numbers.
        let attempts: Vec<u32> = report
            .transitions
            .iter()
            .filter_map(|t| match &t.to {
                UnitState::Retrying { attempt, .. } => Some(*attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2]);
    }

    /// When every attempt fails, the unit ends Failed with the final
    /// attempt's reason.
    #[test]
    fn test_retries_exhausted() {
        let runner = UnitRunner::new();
        let unit = WorkUnit::new("still-doomed");
        let action = FlakyAction::new(u32::MAX);
        let policy = RunPolicy {
            max_attempts: 2,
            ..RunPolicy::default()
        };

        let report = runner.run(&unit, &action, &policy).unwrap();

        match &report.final_state {
            UnitState::Failed { reason } => {
                assert!(reason.contains("transient failure #2"), "reason: {}", reason);
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    /// Observers see every transition exactly once, in order, and their
    /// returned state flows into the recorded transitions.
    #[test]
    fn test_observer_sees_every_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut runner = UnitRunner::new();
        runner.register_observer(Box::new(RecordingObserver { seen: seen.clone() }));

        let unit = WorkUnit::new("watched");
        let report = runner
            .run(&unit, &SucceedingAction, &RunPolicy::default())
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), labels(&report).as_slice());
    }

    /// max_attempts = 0 is clamped to a single attempt rather than running
    /// the action zero times.
    #[test]
    fn test_zero_max_attempts_runs_once() {
        let runner = UnitRunner::new();
        let unit = WorkUnit::new("clamped");
        let action = FlakyAction::new(0);
        let policy = RunPolicy {
            max_attempts: 0,
            ..RunPolicy::default()
        };

        let report = runner.run(&unit, &action, &policy).unwrap();
        assert_eq!(report.final_state, UnitState::Succeeded);
        assert_eq!(*action.calls.lock().unwrap(), 1);
    }

    /// The transition records carry monotonically increasing sequence
    /// numbers starting at 0.
    #[test]
    fn test_transition_sequence_monotonic() {
        let runner = UnitRunner::new();
        let unit = WorkUnit::new("sequenced");
        let action = FlakyAction::new(1);
        let policy = RunPolicy {
            max_attempts: 2,
            ..RunPolicy::default()
        };

        let report = runner.run(&unit, &action, &policy).unwrap();
        for (idx, record) in report.transitions.iter().enumerate() {
            assert_eq!(record.sequence, idx as u64);
            assert_eq!(record.unit_id, unit.id);
        }
    }
}
