//! Deterministic simulation runner.
//!
//! Drives the engine state machine with virtual time and scripted service
//! outcomes, with no tokio and no wall clock. Given the same seed and
//! script, a simulation produces identical results every run, which makes
//! multi-phase scenarios (full rounds, crash recovery, expiry sweeps)
//! testable in microseconds.

mod runner;

pub use runner::{SimRunner, SimStats};
