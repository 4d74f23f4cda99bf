//! Serializable registry state
//!
//! A [`RegistrySnapshot`] captures everything needed to rebuild a registry
//! backed by the in-memory ledger: owner, run state, records with their
//! holders and specs, role sets and the change-log position. Retained event
//! history and sinks are not part of a snapshot.

use std::collections::BTreeMap;

use refreg_authorization::{RoleRegistry, RoleSet};
use refreg_core::{
    Identity, RecordId, RegistryConfig, RegistryError, Result, RunState, RunStateGate,
};
use refreg_journal::ChangeLog;
use refreg_store::{HolderLedger, InMemoryLedger, Record, RecordStore};
use serde::{Deserialize, Serialize};

use crate::registry::Registry;

/// One live record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Record id
    pub id: RecordId,
    /// Current holder
    pub holder: Identity,
    /// Content URI
    pub content_uri: String,
    /// Content update count
    pub seq_num: u64,
    /// Own reference spec, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_spec: Option<String>,
}

/// Token managers of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenManagerEntry {
    /// Record the managers are scoped to
    pub record: RecordId,
    /// Members in enumeration order
    pub managers: Vec<Identity>,
}

/// Complete registry state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Registry owner
    pub owner: Identity,
    /// Run state at capture time
    pub run_state: RunState,
    /// Registry-wide default reference spec
    pub default_ref_spec: String,
    /// Id the next record will receive
    pub next_record_id: RecordId,
    /// Live records in id order
    pub records: Vec<RecordEntry>,
    /// Registry managers in enumeration order
    pub registry_managers: Vec<Identity>,
    /// Token creators in enumeration order
    pub token_creators: Vec<Identity>,
    /// Token managers per record
    #[serde(default)]
    pub token_managers: Vec<TokenManagerEntry>,
    /// Sequence number the next event will receive
    pub next_event_sequence: u64,
}

impl RegistrySnapshot {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON produced by [`RegistrySnapshot::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn role_set(members: Vec<Identity>, what: &str) -> Result<RoleSet> {
    if members.iter().any(Identity::is_zero) {
        return Err(RegistryError::snapshot(format!("zero identity among {what}")));
    }
    let len = members.len();
    let set: RoleSet = members.into_iter().collect();
    if set.len() != len {
        return Err(RegistryError::snapshot(format!("duplicate identity among {what}")));
    }
    Ok(set)
}

impl Registry<InMemoryLedger> {
    /// Capture the current state. Allowed in every run state.
    ///
    /// Deliberate exception to every call failing once Halted: persistence
    /// needs the state, including the `Halted` run state itself.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let (store, roles, ledger) = (self.store(), self.roles(), self.ledger());

        let records = store
            .records()
            .map(|(id, record)| RecordEntry {
                id,
                holder: ledger.holder_of(id).unwrap_or(Identity::ZERO),
                content_uri: record.content_uri.clone(),
                seq_num: record.seq_num,
                ref_spec: store.own_ref_spec(id).ok().flatten().map(str::to_string),
            })
            .collect();

        RegistrySnapshot {
            owner: self.owner_unchecked(),
            run_state: self.gate().state(),
            default_ref_spec: store.default_ref_spec().to_string(),
            next_record_id: store.next_id(),
            records,
            registry_managers: roles.registry_managers().iter().copied().collect(),
            token_creators: roles.token_creators().iter().copied().collect(),
            token_managers: roles
                .token_managers()
                .iter()
                .map(|(record, set)| TokenManagerEntry {
                    record: *record,
                    managers: set.iter().copied().collect(),
                })
                .collect(),
            next_event_sequence: self.change_log().next_sequence(),
        }
    }

    /// Rebuild a registry from a snapshot.
    ///
    /// Event sinks and history limits come from `config`; the snapshot's
    /// default reference spec wins over the configured one.
    pub fn restore(snapshot: RegistrySnapshot, config: &RegistryConfig) -> Result<Self> {
        if snapshot.owner.is_zero() {
            return Err(RegistryError::snapshot("owner must not be the zero identity"));
        }

        let mut records = BTreeMap::new();
        let mut ref_specs = BTreeMap::new();
        let mut ledger = InMemoryLedger::new();
        for entry in snapshot.records {
            if entry.holder.is_zero() {
                return Err(RegistryError::snapshot(format!(
                    "record {} has no holder",
                    entry.id
                )));
            }
            if records.contains_key(&entry.id) {
                return Err(RegistryError::snapshot(format!(
                    "record {} listed twice",
                    entry.id
                )));
            }
            ledger.mint(entry.id, entry.holder)?;
            if let Some(spec) = entry.ref_spec {
                ref_specs.insert(entry.id, spec);
            }
            records.insert(
                entry.id,
                Record {
                    content_uri: entry.content_uri,
                    seq_num: entry.seq_num,
                },
            );
        }

        let mut token_managers = BTreeMap::new();
        for entry in snapshot.token_managers {
            if !records.contains_key(&entry.record) {
                return Err(RegistryError::snapshot(format!(
                    "token managers stored for missing record {}",
                    entry.record
                )));
            }
            if token_managers.contains_key(&entry.record) {
                return Err(RegistryError::snapshot(format!(
                    "token managers for record {} listed twice",
                    entry.record
                )));
            }
            token_managers.insert(entry.record, role_set(entry.managers, "token managers")?);
        }

        let roles = RoleRegistry::from_parts(
            role_set(snapshot.registry_managers, "registry managers")?,
            role_set(snapshot.token_creators, "token creators")?,
            token_managers,
        );
        let store = RecordStore::from_parts(
            records,
            ref_specs,
            snapshot.default_ref_spec,
            snapshot.next_record_id,
        )?;
        let mut log = ChangeLog::from_config(config);
        log.resume_at(snapshot.next_event_sequence);

        tracing::info!(
            owner = %snapshot.owner,
            run_state = %snapshot.run_state,
            records = store.len(),
            "registry restored"
        );
        Ok(Self::from_parts(
            snapshot.owner,
            RunStateGate::with_state(snapshot.run_state),
            roles,
            store,
            ledger,
            log,
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use refreg_authorization::{RoleKind, RoleScope};

    fn who(name: &str) -> Identity {
        Identity::from_name(name)
    }

    fn populated() -> Registry {
        let mut reg = Registry::new(who("owner")).unwrap();
        reg.grant_role(who("owner"), RoleKind::RegistryManager, who("m"), RoleScope::Global)
            .unwrap();
        reg.grant_role(who("owner"), RoleKind::TokenCreator, who("c"), RoleScope::Global)
            .unwrap();
        let a = reg.create(who("c"), "ipfs://a").unwrap();
        let b = reg.create(who("owner"), "ipfs://b").unwrap();
        reg.update_content(who("c"), a, "ipfs://a2").unwrap();
        reg.update_ref_spec(who("owner"), b, "spec-b").unwrap();
        reg.grant_role(who("c"), RoleKind::TokenManager, who("x"), a.into())
            .unwrap();
        reg
    }

    #[test]
    fn restore_preserves_observable_state() {
        let reg = populated();
        let snapshot = reg.snapshot();
        let json = snapshot.to_json().unwrap();
        let restored =
            Registry::restore(RegistrySnapshot::from_json(&json).unwrap(), &RegistryConfig::default())
                .unwrap();

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.read_content(RecordId(1)).unwrap(), "ipfs://a2");
        assert_eq!(restored.read_seq_num(RecordId(1)).unwrap(), 1);
        assert_eq!(restored.read_ref_spec(RecordId(2)).unwrap(), "spec-b");
        assert_eq!(restored.holder_of(RecordId(1)).unwrap(), who("c"));
        assert_eq!(
            restored.change_log().next_sequence(),
            reg.change_log().next_sequence()
        );
    }

    #[test]
    fn restore_rejects_inconsistent_snapshots() {
        let base = populated().snapshot();

        let mut reused = base.clone();
        reused.next_record_id = RecordId(2);
        assert_eq!(
            Registry::restore(reused, &RegistryConfig::default())
                .unwrap_err()
                .code(),
            "snapshot"
        );

        let mut orphan = base.clone();
        orphan.token_managers.push(TokenManagerEntry {
            record: RecordId(9),
            managers: vec![who("x")],
        });
        assert!(Registry::restore(orphan, &RegistryConfig::default()).is_err());

        let mut no_owner = base;
        no_owner.owner = Identity::ZERO;
        assert!(Registry::restore(no_owner, &RegistryConfig::default()).is_err());
    }

    #[test]
    fn exhausted_id_space_rejects_create_cleanly() {
        let mut snapshot = populated().snapshot();
        snapshot.next_record_id = RecordId(u64::MAX - 1);
        let mut reg = Registry::restore(snapshot, &RegistryConfig::default()).unwrap();
        let before = reg.change_log().next_sequence();

        assert_eq!(
            reg.create(who("owner"), "ipfs://late"),
            Err(RegistryError::invalid("record id space exhausted"))
        );
        assert!(!reg.exists(RecordId(u64::MAX - 1)).unwrap());
        assert!(reg.holder_of(RecordId(u64::MAX - 1)).is_err());
        assert_eq!(reg.record_count().unwrap(), 2);
        assert_eq!(reg.change_log().next_sequence(), before);

        let mut at_limit = reg.snapshot();
        at_limit.next_record_id = RecordId::LIMIT;
        assert_eq!(
            Registry::restore(at_limit, &RegistryConfig::default())
                .unwrap_err()
                .code(),
            "snapshot"
        );
    }

    #[test]
    fn halted_registry_can_be_snapshotted() {
        let mut reg = populated();
        reg.set_running_state(who("owner"), RunState::Halted).unwrap();
        let snapshot = reg.snapshot();
        assert_eq!(snapshot.run_state, RunState::Halted);
        assert_eq!(reg.running_state(), Err(RegistryError::Halted));
        let restored = Registry::restore(snapshot, &RegistryConfig::default()).unwrap();
        assert_eq!(restored.running_state(), Err(RegistryError::Halted));
    }
}
