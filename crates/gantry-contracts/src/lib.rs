//! # gantry-contracts
//!
//! Shared types and contracts for the gantry runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod error;
pub mod portability;
pub mod state;
pub mod unit;
