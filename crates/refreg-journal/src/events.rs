//! Change event types.

use refreg_authorization::RoleKind;
use refreg_core::{Identity, RecordId, RunState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a role change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleChange {
    /// Role granted
    Grant,
    /// Role revoked
    Revoke,
}

impl fmt::Display for RoleChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleChange::Grant => f.write_str("grant"),
            RoleChange::Revoke => f.write_str("revoke"),
        }
    }
}

/// A registry mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChangeEvent {
    /// Record minted
    RecordCreated {
        /// Caller
        actor: Identity,
        /// New record
        record: RecordId,
        /// Initial holder
        holder: Identity,
        /// Initial content URI
        content_uri: String,
    },

    /// Content URI replaced
    ContentUpdated {
        /// Caller
        actor: Identity,
        /// Updated record
        record: RecordId,
        /// New content URI
        content_uri: String,
        /// Sequence number after the update
        seq_num: u64,
    },

    /// Registry-manager or token-manager membership changed
    RoleChanged {
        /// Caller
        actor: Identity,
        /// Role affected
        role: RoleKind,
        /// Identity granted or revoked
        target: Identity,
        /// Record for token-manager changes, none for global roles
        record: Option<RecordId>,
        /// Grant or revoke
        change: RoleChange,
    },

    /// Per-record reference spec replaced
    RefSpecUpdated {
        /// Caller
        actor: Identity,
        /// Updated record
        record: RecordId,
        /// Record's current sequence number (unchanged by this update)
        seq_num: u64,
        /// New reference spec
        ref_spec: String,
    },

    /// Registry-wide default reference spec replaced
    DefaultRefSpecUpdated {
        /// Caller
        actor: Identity,
        /// Id the next minted record will receive
        next_record_id: RecordId,
        /// New default
        ref_spec: String,
    },

    /// Run state moved
    RunStateChanged {
        /// Caller
        actor: Identity,
        /// Previous state
        from: RunState,
        /// New state
        to: RunState,
    },

    /// Record destroyed, after its managers were revoked
    RecordDestroyed {
        /// Caller
        actor: Identity,
        /// Destroyed record
        record: RecordId,
    },

    /// Holder-initiated transfer
    HolderTransferred {
        /// Caller
        actor: Identity,
        /// Transferred record
        record: RecordId,
        /// Previous holder
        from: Identity,
        /// New holder
        to: Identity,
    },

    /// Registry ownership handed over
    OwnershipTransferred {
        /// Previous owner
        previous: Identity,
        /// New owner
        owner: Identity,
    },
}

impl ChangeEvent {
    /// Role change event, or `None` for roles whose changes are not logged.
    ///
    /// Token-creator grants and revokes are silent.
    pub fn role_changed(
        actor: Identity,
        role: RoleKind,
        target: Identity,
        record: Option<RecordId>,
        change: RoleChange,
    ) -> Option<Self> {
        match role {
            RoleKind::TokenCreator => None,
            RoleKind::RegistryManager => Some(Self::RoleChanged {
                actor,
                role,
                target,
                record: None,
                change,
            }),
            RoleKind::TokenManager => Some(Self::RoleChanged {
                actor,
                role,
                target,
                record,
                change,
            }),
        }
    }

    /// Identity that caused the event
    pub fn actor(&self) -> Identity {
        match self {
            Self::RecordCreated { actor, .. }
            | Self::ContentUpdated { actor, .. }
            | Self::RoleChanged { actor, .. }
            | Self::RefSpecUpdated { actor, .. }
            | Self::DefaultRefSpecUpdated { actor, .. }
            | Self::RunStateChanged { actor, .. }
            | Self::RecordDestroyed { actor, .. }
            | Self::HolderTransferred { actor, .. } => *actor,
            Self::OwnershipTransferred { previous, .. } => *previous,
        }
    }

    /// Record the event concerns, if any
    pub fn record(&self) -> Option<RecordId> {
        match self {
            Self::RecordCreated { record, .. }
            | Self::ContentUpdated { record, .. }
            | Self::RefSpecUpdated { record, .. }
            | Self::RecordDestroyed { record, .. }
            | Self::HolderTransferred { record, .. } => Some(*record),
            Self::RoleChanged { record, .. } => *record,
            Self::DefaultRefSpecUpdated { .. }
            | Self::RunStateChanged { .. }
            | Self::OwnershipTransferred { .. } => None,
        }
    }

    /// Kebab-case kind name, matching the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RecordCreated { .. } => "record-created",
            Self::ContentUpdated { .. } => "content-updated",
            Self::RoleChanged { .. } => "role-changed",
            Self::RefSpecUpdated { .. } => "ref-spec-updated",
            Self::DefaultRefSpecUpdated { .. } => "default-ref-spec-updated",
            Self::RunStateChanged { .. } => "run-state-changed",
            Self::RecordDestroyed { .. } => "record-destroyed",
            Self::HolderTransferred { .. } => "holder-transferred",
            Self::OwnershipTransferred { .. } => "ownership-transferred",
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordCreated {
                actor,
                record,
                holder,
                content_uri,
            } => write!(f, "{actor} created {record} for {holder}: {content_uri}"),
            Self::ContentUpdated {
                actor,
                record,
                content_uri,
                seq_num,
            } => write!(f, "{actor} updated {record} to {content_uri} (seq {seq_num})"),
            Self::RoleChanged {
                actor,
                role,
                target,
                record,
                change,
            } => match record {
                Some(record) => write!(f, "{actor} {change} {role} {target} on {record}"),
                None => write!(f, "{actor} {change} {role} {target}"),
            },
            Self::RefSpecUpdated {
                actor,
                record,
                seq_num,
                ref_spec,
            } => write!(f, "{actor} set spec of {record} (seq {seq_num}) to {ref_spec}"),
            Self::DefaultRefSpecUpdated {
                actor,
                next_record_id,
                ref_spec,
            } => write!(
                f,
                "{actor} set default spec to {ref_spec} (next record {next_record_id})"
            ),
            Self::RunStateChanged { actor, from, to } => {
                write!(f, "{actor} moved run state {from} -> {to}")
            }
            Self::RecordDestroyed { actor, record } => write!(f, "{actor} destroyed {record}"),
            Self::HolderTransferred {
                actor,
                record,
                from,
                to,
            } => write!(f, "{actor} transferred {record} from {from} to {to}"),
            Self::OwnershipTransferred { previous, owner } => {
                write!(f, "ownership moved from {previous} to {owner}")
            }
        }
    }
}

/// Event with its position in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Monotonic position, starting at 1
    pub sequence: u64,
    /// The mutation
    #[serde(flatten)]
    pub event: ChangeEvent,
}

impl LoggedEvent {
    /// Serialize as a single JSON line
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn who(name: &str) -> Identity {
        Identity::from_name(name)
    }

    #[test]
    fn token_creator_changes_are_silent() {
        assert!(ChangeEvent::role_changed(
            who("m"),
            RoleKind::TokenCreator,
            who("y"),
            None,
            RoleChange::Grant
        )
        .is_none());
    }

    #[test]
    fn registry_manager_changes_carry_no_record() {
        let event = ChangeEvent::role_changed(
            who("owner"),
            RoleKind::RegistryManager,
            who("m"),
            Some(RecordId(3)),
            RoleChange::Revoke,
        )
        .unwrap();
        assert_eq!(event.record(), None);
        assert_eq!(event.actor(), who("owner"));
    }

    #[test]
    fn json_line_is_tagged_and_sequenced() {
        let logged = LoggedEvent {
            sequence: 4,
            event: ChangeEvent::ContentUpdated {
                actor: who("x"),
                record: RecordId(1),
                content_uri: "ipfs://b".to_string(),
                seq_num: 1,
            },
        };
        let line = logged.to_json_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["kind"], "content-updated");
        assert_eq!(value["sequence"], 4);
        assert_eq!(value["record"], 1);
        assert_eq!(value["seq_num"], 1);
        assert_eq!(value["content_uri"], "ipfs://b");
    }
}
