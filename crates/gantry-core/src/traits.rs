//! Core trait definitions for the gantry execution seam.
//!
//! Two traits define the boundary between the runner and everything else:
//!
//! - `UnitAction`    — the computation behind a work unit (untrusted)
//! - `StateObserver` — a callback watching every state transition (trusted)
//!
//! The runner wires them together: it drives the unit's state machine,
//! calls the action once per attempt, and threads every transition through
//! every registered observer in registration order.

use gantry_contracts::{
    error::GantryResult,
    state::UnitState,
    unit::WorkUnit,
};

/// The computation a work unit performs.
///
/// Implementations are considered **untrusted** — they may call external
/// services, tools, or arbitrary code. The runner decides what an error
/// return means (trap into `Failed` state or propagate) based on the run
/// policy; the action itself never sees that decision.
pub trait UnitAction: Send + Sync {
    /// Execute one attempt of the unit's computation.
    ///
    /// Returns the output payload on success. An `Err` return marks the
    /// attempt as failed; whether that becomes a `Failed`/`Retrying` state
    /// or an error surfaced to the caller is the runner's call, not the
    /// action's.
    fn execute(&self, unit: &WorkUnit) -> GantryResult<serde_json::Value>;
}

/// An observer invoked on every state transition of a work unit.
///
/// Observers are **trusted** bookkeeping hooks: they may record, count, or
/// collect, but they must not steer execution. The contract is:
///
/// - `on_transition` must return `new` unchanged — it is called for its
///   side effects on the observer's own state, never to rewrite the
///   transition.
/// - It must be safe to invoke repeatedly for the same unit across retries;
///   a unit that fails, retries, and fails again will be seen several times.
///
/// The runner threads the state value through each observer in registration
/// order, so a misbehaving observer *could* alter it — implementations that
/// do so are in breach of this contract, not exercising an extension point.
pub trait StateObserver: Send + Sync {
    /// Called after the runner computes the unit's next state.
    ///
    /// `old` is the state being left, `new` the state being entered.
    /// Return `new` unchanged.
    fn on_transition(&self, unit: &WorkUnit, old: &UnitState, new: UnitState) -> UnitState;
}
