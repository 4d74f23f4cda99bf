//! # refreg-store - Record Store
//!
//! The record table (existence, content URI, sequence number, reference
//! specs) and the boundary to the ledger that tracks record holders.
//!
//! Pure synchronous storage: authorization and run-state checks happen in
//! the registry facade before any method here is called.

#![forbid(unsafe_code)]

/// Hooks exposed to indexing layers and external ledgers
pub mod hooks;

/// Holder ledger collaborator
pub mod ledger;

/// Stored record contents
pub mod record;

/// Record table
pub mod store;

pub use hooks::{RecordContent, TransferHook};
pub use ledger::{HolderLedger, InMemoryLedger};
pub use record::Record;
pub use store::RecordStore;
