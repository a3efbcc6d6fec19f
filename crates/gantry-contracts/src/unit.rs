//! Work-unit identity types.
//!
//! A work unit is an individually scheduled piece of computation inside the
//! surrounding orchestration framework. Gantry treats it as opaque beyond
//! identity — scheduling, dependencies, and execution backends live elsewhere.

use serde::{Deserialize, Serialize};

/// Unique identifier for a single work unit.
///
/// Appears in transition records, failure-collector sets, and log output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub uuid::Uuid);

impl UnitId {
    /// Create a new, unique unit ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The unit of work the runner drives and observers watch.
///
/// The runtime never inspects the computation itself — that lives behind the
/// `UnitAction` trait in gantry-core. This struct is only identity plus a
/// human-readable name for logs and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkUnit {
    /// Unique identity, stable across retries of the same unit.
    pub id: UnitId,
    /// Human-readable name (e.g. "fetch-invoices", "resize-batch-7").
    pub name: String,
}

impl WorkUnit {
    /// Create a work unit with a fresh ID and the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UnitId::new(),
            name: name.into(),
        }
    }
}
