//! Record table
//!
//! Owns record existence, content, per-record reference specs, the
//! registry-wide default spec and the id counter. It performs no
//! authorization and consults no run state; the registry facade does both
//! before calling in.

use refreg_core::{RecordId, RegistryError, Result};
use std::collections::BTreeMap;

use crate::record::Record;

/// Record table with explicit existence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStore {
    records: BTreeMap<RecordId, Record>,
    ref_specs: BTreeMap<RecordId, String>,
    default_ref_spec: String,
    next_id: RecordId,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl RecordStore {
    /// Empty store whose first record will be id 1
    pub fn new(default_ref_spec: impl Into<String>) -> Self {
        Self {
            records: BTreeMap::new(),
            ref_specs: BTreeMap::new(),
            default_ref_spec: default_ref_spec.into(),
            next_id: RecordId::FIRST,
        }
    }

    /// Rebuild from persisted parts.
    ///
    /// Fails if `next_id` is out of range, would reuse a stored id, or a spec
    /// belongs to no record.
    pub fn from_parts(
        records: BTreeMap<RecordId, Record>,
        ref_specs: BTreeMap<RecordId, String>,
        default_ref_spec: String,
        next_id: RecordId,
    ) -> Result<Self> {
        if next_id < RecordId::FIRST {
            return Err(RegistryError::snapshot("next record id must be at least 1"));
        }
        if next_id >= RecordId::LIMIT {
            return Err(RegistryError::snapshot(format!(
                "next record id {next_id} is outside the id space"
            )));
        }
        if let Some((last, _)) = records.last_key_value() {
            if *last >= next_id {
                return Err(RegistryError::snapshot(format!(
                    "next record id {next_id} would reuse stored record {last}"
                )));
            }
        }
        if let Some(orphan) = ref_specs.keys().find(|id| !records.contains_key(id)) {
            return Err(RegistryError::snapshot(format!(
                "reference spec stored for missing record {orphan}"
            )));
        }
        Ok(Self {
            records,
            ref_specs: ref_specs
                .into_iter()
                .filter(|(_, spec)| !spec.is_empty())
                .collect(),
            default_ref_spec,
            next_id,
        })
    }

    /// Whether `id` names a live record
    pub fn exists(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// Fail with `RecordNotFound` unless `id` is live
    pub fn ensure_exists(&self, id: RecordId) -> Result<()> {
        if self.exists(id) {
            Ok(())
        } else {
            Err(RegistryError::record_not_found(id))
        }
    }

    /// Live record
    pub fn get(&self, id: RecordId) -> Result<&Record> {
        self.records
            .get(&id)
            .ok_or_else(|| RegistryError::record_not_found(id))
    }

    /// Id the next inserted record will receive
    pub fn next_id(&self) -> RecordId {
        self.next_id
    }

    /// Id the next insert will use, failing once the id space is used up
    pub fn allocatable_id(&self) -> Result<RecordId> {
        match self.next_id.checked_next() {
            Some(_) => Ok(self.next_id),
            None => Err(RegistryError::invalid("record id space exhausted")),
        }
    }

    /// Insert a new record under the next id
    pub fn insert(&mut self, content_uri: impl Into<String>) -> Result<RecordId> {
        let content_uri = content_uri.into();
        if content_uri.is_empty() {
            return Err(RegistryError::EmptyContent);
        }
        let id = self.allocatable_id()?;
        let next = id
            .checked_next()
            .ok_or_else(|| RegistryError::invalid("record id space exhausted"))?;
        self.records.insert(id, Record::new(content_uri));
        self.next_id = next;
        tracing::trace!(record = %id, "record inserted");
        Ok(id)
    }

    /// Replace content, returning the new sequence number
    pub fn update_content(&mut self, id: RecordId, content_uri: impl Into<String>) -> Result<u64> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| RegistryError::record_not_found(id))?;
        Ok(record.replace_content(content_uri))
    }

    /// Remove a record: its reference spec first, then the record itself
    pub fn remove(&mut self, id: RecordId) -> Result<Record> {
        self.ensure_exists(id)?;
        self.ref_specs.remove(&id);
        self.records
            .remove(&id)
            .ok_or_else(|| RegistryError::record_not_found(id))
    }

    /// Set a record's own spec. An empty spec clears it so reads fall back
    /// to the default. The sequence number is untouched.
    pub fn set_ref_spec(&mut self, id: RecordId, ref_spec: impl Into<String>) -> Result<()> {
        self.ensure_exists(id)?;
        let ref_spec = ref_spec.into();
        if ref_spec.is_empty() {
            self.ref_specs.remove(&id);
        } else {
            self.ref_specs.insert(id, ref_spec);
        }
        Ok(())
    }

    /// The record's own spec, if set
    pub fn own_ref_spec(&self, id: RecordId) -> Result<Option<&str>> {
        self.ensure_exists(id)?;
        Ok(self.ref_specs.get(&id).map(String::as_str))
    }

    /// Own spec if set, else the registry default (computed at read time)
    pub fn effective_ref_spec(&self, id: RecordId) -> Result<&str> {
        Ok(self
            .own_ref_spec(id)?
            .unwrap_or(self.default_ref_spec.as_str()))
    }

    /// Registry-wide default spec
    pub fn default_ref_spec(&self) -> &str {
        &self.default_ref_spec
    }

    /// Replace the registry-wide default spec
    pub fn set_default_ref_spec(&mut self, ref_spec: impl Into<String>) {
        self.default_ref_spec = ref_spec.into();
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no live records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Live records in id order
    pub fn records(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    /// Per-record specs in id order
    pub fn ref_specs(&self) -> impl Iterator<Item = (RecordId, &str)> {
        self.ref_specs.iter().map(|(id, spec)| (*id, spec.as_str()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn ids_start_at_one_and_are_never_reused() {
        let mut store = RecordStore::default();
        let first = store.insert("ipfs://a").unwrap();
        let second = store.insert("ipfs://b").unwrap();
        store.remove(second).unwrap();
        let third = store.insert("ipfs://c").unwrap();
        assert_eq!((first, second, third), (RecordId(1), RecordId(2), RecordId(3)));
    }

    #[test]
    fn empty_content_is_rejected_without_consuming_an_id() {
        let mut store = RecordStore::default();
        assert_eq!(store.insert(""), Err(RegistryError::EmptyContent));
        assert_eq!(store.next_id(), RecordId(1));
    }

    #[test]
    fn exhausted_id_space_fails_without_inserting() {
        let mut store = RecordStore::from_parts(
            BTreeMap::new(),
            BTreeMap::new(),
            String::new(),
            RecordId(u64::MAX - 2),
        )
        .unwrap();
        assert_eq!(store.insert("ipfs://a").unwrap(), RecordId(u64::MAX - 2));
        assert_eq!(
            store.insert("ipfs://b"),
            Err(RegistryError::invalid("record id space exhausted"))
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.next_id(), RecordId(u64::MAX - 1));
    }

    #[test]
    fn from_parts_rejects_counter_at_limit() {
        let err = RecordStore::from_parts(
            BTreeMap::new(),
            BTreeMap::new(),
            String::new(),
            RecordId::LIMIT,
        )
        .unwrap_err();
        assert_eq!(err.code(), "snapshot");
    }

    #[test]
    fn fresh_record_exists_at_sequence_zero() {
        let mut store = RecordStore::default();
        let id = store.insert("ipfs://a").unwrap();
        assert!(store.exists(id));
        assert_eq!(store.get(id).unwrap().seq_num, 0);
        assert!(!store.exists(RecordId(0)));
    }

    #[test]
    fn spec_updates_leave_sequence_alone() {
        let mut store = RecordStore::new("default");
        let id = store.insert("ipfs://a").unwrap();
        assert_eq!(store.update_content(id, "ipfs://b").unwrap(), 1);
        store.set_ref_spec(id, "own").unwrap();
        assert_eq!(store.get(id).unwrap().seq_num, 1);
    }

    #[test]
    fn own_spec_wins_over_later_default() {
        let mut store = RecordStore::new("d1");
        let id = store.insert("ipfs://a").unwrap();
        assert_eq!(store.effective_ref_spec(id).unwrap(), "d1");
        store.set_ref_spec(id, "own").unwrap();
        store.set_default_ref_spec("d2");
        assert_eq!(store.effective_ref_spec(id).unwrap(), "own");
        store.set_ref_spec(id, "").unwrap();
        assert_eq!(store.effective_ref_spec(id).unwrap(), "d2");
    }

    #[test]
    fn remove_drops_spec_and_record() {
        let mut store = RecordStore::default();
        let id = store.insert("ipfs://a").unwrap();
        store.set_ref_spec(id, "own").unwrap();
        store.remove(id).unwrap();
        assert_eq!(store.ref_specs().count(), 0);
        assert_eq!(store.get(id), Err(RegistryError::record_not_found(id)));
        assert_eq!(store.remove(id), Err(RegistryError::record_not_found(id)));
    }

    #[test]
    fn from_parts_rejects_id_reuse() {
        let mut records = BTreeMap::new();
        records.insert(RecordId(3), Record::new("ipfs://a"));
        let err = RecordStore::from_parts(records, BTreeMap::new(), String::new(), RecordId(3))
            .unwrap_err();
        assert_eq!(err.code(), "snapshot");
    }

    #[test]
    fn from_parts_rejects_orphan_specs() {
        let mut specs = BTreeMap::new();
        specs.insert(RecordId(1), "spec".to_string());
        let err = RecordStore::from_parts(BTreeMap::new(), specs, String::new(), RecordId(2))
            .unwrap_err();
        assert_eq!(err.code(), "snapshot");
    }
}
