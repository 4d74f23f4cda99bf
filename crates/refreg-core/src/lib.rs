//! # refreg-core - Foundation
//!
//! Types shared by every registry crate: caller and record identifiers, the
//! unified [`RegistryError`], the [`RunStateGate`] lifecycle and
//! [`RegistryConfig`].
//!
//! ## What's NOT in this crate
//!
//! - Role membership and authorization predicates (`refreg-authorization`)
//! - The record table (`refreg-store`)
//! - Change events (`refreg-journal`)
//! - Operation sequencing (`refreg-registry`)

#![forbid(unsafe_code)]

/// Layered registry configuration
pub mod config;

/// Unified registry error type
pub mod errors;

/// Caller and record identifiers
pub mod identifiers;

/// Run-state lifecycle and guards
pub mod run_state;

pub use config::{LoadableConfig, RegistryConfig};
pub use errors::{RegistryError, Result};
pub use identifiers::{Identity, RecordId};
pub use run_state::{RunState, RunStateGate};
