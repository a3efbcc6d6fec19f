//! # gantry-core
//!
//! The work-unit execution seam for the gantry runtime.
//!
//! This crate provides:
//! - The two seam traits (`UnitAction`, `StateObserver`)
//! - The `UnitRunner` that drives a unit's state machine under an explicit
//!   `RunPolicy`
//! - The `FailureCollector` observer that records failing units into a
//!   caller-supplied shared set
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gantry_core::{runner::{RunPolicy, UnitRunner}, collect::FailureCollector};
//! ```

pub mod collect;
pub mod runner;
pub mod traits;

pub use collect::{FailureCollector, SharedUnitSet};
pub use runner::{RunPolicy, RunReport, UnitRunner};
