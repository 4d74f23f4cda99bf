//! Thread-safe registry handle
//!
//! Operations take the write lock for their whole check-then-mutate
//! sequence, so concurrent callers observe each operation atomically. Reads
//! share the lock.

use std::sync::Arc;

use parking_lot::RwLock;
use refreg_core::{Identity, RecordId, Result, RunState};
use refreg_store::{HolderLedger, InMemoryLedger};

use crate::registry::Registry;

/// Cloneable handle to a registry behind a read-write lock
#[derive(Debug)]
pub struct SharedRegistry<L: HolderLedger = InMemoryLedger> {
    inner: Arc<RwLock<Registry<L>>>,
}

impl<L: HolderLedger> Clone for SharedRegistry<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: HolderLedger> SharedRegistry<L> {
    /// Wrap a registry
    pub fn new(registry: Registry<L>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Run `f` under the read lock
    pub fn read<T>(&self, f: impl FnOnce(&Registry<L>) -> T) -> T {
        f(&self.inner.read())
    }

    /// Run `f` under the write lock
    pub fn write<T>(&self, f: impl FnOnce(&mut Registry<L>) -> T) -> T {
        f(&mut self.inner.write())
    }

    /// See [`Registry::create`]
    pub fn create(&self, caller: Identity, content_uri: impl Into<String>) -> Result<RecordId> {
        self.write(|r| r.create(caller, content_uri))
    }

    /// See [`Registry::update_content`]
    pub fn update_content(
        &self,
        caller: Identity,
        id: RecordId,
        content_uri: impl Into<String>,
    ) -> Result<u64> {
        self.write(|r| r.update_content(caller, id, content_uri))
    }

    /// See [`Registry::read_content`]
    pub fn read_content(&self, id: RecordId) -> Result<String> {
        self.read(|r| r.read_content(id))
    }

    /// See [`Registry::read_seq_num`]
    pub fn read_seq_num(&self, id: RecordId) -> Result<u64> {
        self.read(|r| r.read_seq_num(id))
    }

    /// See [`Registry::set_running_state`]
    pub fn set_running_state(&self, caller: Identity, to: RunState) -> Result<()> {
        self.write(|r| r.set_running_state(caller, to))
    }

    /// Recover the registry if this is the last handle
    pub fn try_into_inner(self) -> std::result::Result<Registry<L>, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}
