//! # refreg-cli - Operator tooling
//!
//! Runs declarative registry scenarios and validates configuration files.

#![forbid(unsafe_code)]

/// Command handlers
pub mod commands;

/// TOML scenario format and runner
pub mod scenario;

pub use commands::{check_config, load_config, run_scenario, RunOptions, RunSummary};
pub use scenario::{Action, ScenarioFile, ScenarioStep, StepReport};
