//! Shared test utilities for erpflow integration tests.
//!
//! This module provides:
//! - `run_workflow` and `RunnerHarness` for isolated execution against a mock page
//! - `PayloadBuilder` for creating estimation requests programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{dry_run_config, run_workflow, RunnerHarness};
