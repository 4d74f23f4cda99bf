//! # refreg-registry - Registry Facade
//!
//! The public operation surface of a permissioned reference-metadata
//! registry. [`Registry`] composes the run-state gate, role registry,
//! record store, holder ledger and change log, and sequences every call as
//! gate → existence → authorization → validation → mutation → events.
//!
//! ```ignore
//! let owner = Identity::from_name("owner");
//! let mut registry = Registry::new(owner)?;
//! let id = registry.create(owner, "ipfs://content")?;
//! assert_eq!(registry.read_seq_num(id)?, 0);
//! ```

#![forbid(unsafe_code)]

/// Operation sequencing over the registry components
pub mod registry;

/// Thread-safe handle
pub mod shared;

/// Serializable state capture and restore
pub mod snapshot;

pub use registry::Registry;
pub use shared::SharedRegistry;
pub use snapshot::{RecordEntry, RegistrySnapshot, TokenManagerEntry};

pub use refreg_authorization::{reasons, RoleKind, RoleScope};
pub use refreg_core::{
    Identity, LoadableConfig, RecordId, RegistryConfig, RegistryError, Result, RunState,
};
pub use refreg_journal::{
    BroadcastSink, ChangeEvent, EventSink, LoggedEvent, MemorySink, RoleChange, TracingSink,
};
pub use refreg_store::{HolderLedger, InMemoryLedger, RecordContent, TransferHook};
