//! Role membership sets
//!
//! Three independent permission sets: registry managers and token creators
//! are global, token managers are kept per record. Sets are insertion-ordered
//! for index-based enumeration, but removal swaps the last member into the
//! vacated slot, so positions are not stable across revoke/grant cycles.

use indexmap::IndexSet;
use refreg_core::{Identity, RecordId, RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of role an identity can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleKind {
    /// Global administrator (everything except halt)
    RegistryManager,
    /// Global permission to mint records
    TokenCreator,
    /// Per-record permission to update content and spec
    TokenManager,
}

impl RoleKind {
    /// All role kinds
    pub const ALL: [RoleKind; 3] = [
        RoleKind::RegistryManager,
        RoleKind::TokenCreator,
        RoleKind::TokenManager,
    ];

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::RegistryManager => "registry-manager",
            RoleKind::TokenCreator => "token-creator",
            RoleKind::TokenManager => "token-manager",
        }
    }

    /// Whether the role ignores its scope
    pub fn is_global(&self) -> bool {
        !matches!(self, RoleKind::TokenManager)
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "registry-manager" => Ok(RoleKind::RegistryManager),
            "token-creator" => Ok(RoleKind::TokenCreator),
            "token-manager" => Ok(RoleKind::TokenManager),
            other => Err(RegistryError::unknown_role(other)),
        }
    }
}

/// Where a role applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleScope {
    /// Registry-wide
    #[default]
    Global,
    /// A single record
    Record(RecordId),
}

impl RoleScope {
    /// Record id, if record-scoped
    pub fn record(&self) -> Option<RecordId> {
        match self {
            RoleScope::Global => None,
            RoleScope::Record(id) => Some(*id),
        }
    }
}

impl From<RecordId> for RoleScope {
    fn from(id: RecordId) -> Self {
        RoleScope::Record(id)
    }
}

/// Insertion-ordered membership set without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    members: IndexSet<Identity>,
}

impl RoleSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member; returns false if already present
    pub fn insert(&mut self, identity: Identity) -> bool {
        self.members.insert(identity)
    }

    /// Remove a member by swapping the last member into its slot
    pub fn remove(&mut self, identity: &Identity) -> bool {
        self.members.swap_remove(identity)
    }

    /// O(1) membership
    pub fn contains(&self, identity: &Identity) -> bool {
        self.members.contains(identity)
    }

    /// Member at `index`
    pub fn get(&self, index: usize) -> Option<Identity> {
        self.members.get_index(index).copied()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.members.iter()
    }
}

impl FromIterator<Identity> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Identity>>(iter: T) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

/// The three permission sets of a registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRegistry {
    registry_managers: RoleSet,
    token_creators: RoleSet,
    token_managers: BTreeMap<RecordId, RoleSet>,
}

impl RoleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted sets. Empty per-record sets are dropped.
    pub fn from_parts(
        registry_managers: RoleSet,
        token_creators: RoleSet,
        token_managers: BTreeMap<RecordId, RoleSet>,
    ) -> Self {
        Self {
            registry_managers,
            token_creators,
            token_managers: token_managers
                .into_iter()
                .filter(|(_, set)| !set.is_empty())
                .collect(),
        }
    }

    fn set(&self, role: RoleKind, scope: RoleScope) -> Option<&RoleSet> {
        match (role, scope) {
            (RoleKind::RegistryManager, _) => Some(&self.registry_managers),
            (RoleKind::TokenCreator, _) => Some(&self.token_creators),
            (RoleKind::TokenManager, RoleScope::Record(id)) => self.token_managers.get(&id),
            (RoleKind::TokenManager, RoleScope::Global) => None,
        }
    }

    /// Pure membership query. Missing sets answer false.
    pub fn has_role(&self, role: RoleKind, identity: &Identity, scope: RoleScope) -> bool {
        self.set(role, scope)
            .is_some_and(|set| set.contains(identity))
    }

    /// Add `identity` to the role; returns whether it was newly added
    pub fn grant(&mut self, role: RoleKind, identity: Identity, scope: RoleScope) -> Result<bool> {
        if identity.is_zero() {
            return Err(RegistryError::InvalidIdentity);
        }
        let set = match (role, scope) {
            (RoleKind::RegistryManager, _) => &mut self.registry_managers,
            (RoleKind::TokenCreator, _) => &mut self.token_creators,
            (RoleKind::TokenManager, RoleScope::Record(id)) => {
                self.token_managers.entry(id).or_default()
            }
            (RoleKind::TokenManager, RoleScope::Global) => {
                return Err(RegistryError::invalid(
                    "token-manager grants need a record scope",
                ))
            }
        };
        Ok(set.insert(identity))
    }

    /// Remove `identity` from the role; returns whether it was a member
    pub fn revoke(&mut self, role: RoleKind, identity: &Identity, scope: RoleScope) -> Result<bool> {
        if identity.is_zero() {
            return Err(RegistryError::InvalidIdentity);
        }
        let removed = match (role, scope) {
            (RoleKind::RegistryManager, _) => self.registry_managers.remove(identity),
            (RoleKind::TokenCreator, _) => self.token_creators.remove(identity),
            (RoleKind::TokenManager, RoleScope::Record(id)) => {
                let removed = self
                    .token_managers
                    .get_mut(&id)
                    .is_some_and(|set| set.remove(identity));
                if self.token_managers.get(&id).is_some_and(RoleSet::is_empty) {
                    self.token_managers.remove(&id);
                }
                removed
            }
            (RoleKind::TokenManager, RoleScope::Global) => false,
        };
        Ok(removed)
    }

    /// Number of members; zero for a missing set
    pub fn count(&self, role: RoleKind, scope: RoleScope) -> usize {
        self.set(role, scope).map_or(0, RoleSet::len)
    }

    /// Member at `index`, failing with `UnknownRole` when out of range
    pub fn member_at(&self, role: RoleKind, index: usize, scope: RoleScope) -> Result<Identity> {
        self.set(role, scope)
            .and_then(|set| set.get(index))
            .ok_or_else(|| {
                RegistryError::unknown_role(format!("no {role} member at index {index}"))
            })
    }

    /// All members in enumeration order; empty for a missing set
    pub fn members(&self, role: RoleKind, scope: RoleScope) -> Vec<Identity> {
        self.set(role, scope)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every token manager of `record`, returning them in enumeration
    /// order
    pub fn clear_record(&mut self, record: RecordId) -> Vec<Identity> {
        self.token_managers
            .remove(&record)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Global registry managers
    pub fn registry_managers(&self) -> &RoleSet {
        &self.registry_managers
    }

    /// Global token creators
    pub fn token_creators(&self) -> &RoleSet {
        &self.token_creators
    }

    /// Per-record token managers, keyed by record
    pub fn token_managers(&self) -> &BTreeMap<RecordId, RoleSet> {
        &self.token_managers
    }
}
