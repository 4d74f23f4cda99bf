//! # refreg-journal - Change Log
//!
//! Structured events for every registry mutation: content updates, role
//! grants and revokes, reference-spec updates, run-state changes and record
//! lifecycle. Events are staged per operation and committed as a batch, so
//! only successful operations are ever observed by sinks.

#![forbid(unsafe_code)]

/// Change event types
pub mod events;

/// Sequenced log and per-operation batches
pub mod log;

/// Destinations for committed events
pub mod sink;

pub use events::{ChangeEvent, LoggedEvent, RoleChange};
pub use log::{ChangeLog, EventBatch};
pub use sink::{BroadcastSink, EventSink, MemorySink, TracingSink};
