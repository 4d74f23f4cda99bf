//! Holder ledger collaborator
//!
//! The registry does not own transfer mechanics. It consumes three
//! primitives from whatever ledger tracks record ownership (mint, burn,
//! current holder) and calls `transfer` only after its own transfer hook has
//! approved the move. [`InMemoryLedger`] is the default implementation.

use refreg_core::{Identity, RecordId, RegistryError, Result};
use std::collections::BTreeMap;

/// Ownership primitives consumed by the registry
pub trait HolderLedger: Send + Sync {
    /// Record `holder` as the owner of a newly created `id`
    fn mint(&mut self, id: RecordId, holder: Identity) -> Result<()>;

    /// Forget `id`, returning its last holder
    fn burn(&mut self, id: RecordId) -> Result<Identity>;

    /// Current holder
    fn holder_of(&self, id: RecordId) -> Option<Identity>;

    /// Move `id` to `to`, returning the previous holder
    fn transfer(&mut self, id: RecordId, to: Identity) -> Result<Identity>;

    /// Number of records held by `holder`
    fn balance_of(&self, holder: &Identity) -> usize;
}

/// Map-backed ledger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryLedger {
    holders: BTreeMap<RecordId, Identity>,
}

impl InMemoryLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// All holdings in id order
    pub fn holdings(&self) -> impl Iterator<Item = (RecordId, Identity)> + '_ {
        self.holders.iter().map(|(id, holder)| (*id, *holder))
    }
}

impl HolderLedger for InMemoryLedger {
    fn mint(&mut self, id: RecordId, holder: Identity) -> Result<()> {
        if holder.is_zero() {
            return Err(RegistryError::InvalidIdentity);
        }
        if self.holders.contains_key(&id) {
            return Err(RegistryError::invalid(format!("record {id} already minted")));
        }
        self.holders.insert(id, holder);
        Ok(())
    }

    fn burn(&mut self, id: RecordId) -> Result<Identity> {
        self.holders
            .remove(&id)
            .ok_or_else(|| RegistryError::record_not_found(id))
    }

    fn holder_of(&self, id: RecordId) -> Option<Identity> {
        self.holders.get(&id).copied()
    }

    fn transfer(&mut self, id: RecordId, to: Identity) -> Result<Identity> {
        if to.is_zero() {
            return Err(RegistryError::InvalidIdentity);
        }
        let holder = self
            .holders
            .get_mut(&id)
            .ok_or_else(|| RegistryError::record_not_found(id))?;
        Ok(std::mem::replace(holder, to))
    }

    fn balance_of(&self, holder: &Identity) -> usize {
        self.holders.values().filter(|h| *h == holder).count()
    }
}
