//! Identifier types used across the registry
//!
//! [`Identity`] names a caller (owner, manager, creator or holder) and
//! [`RecordId`] names a record. Identities are opaque; the registry never
//! authenticates them, it only compares them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::RegistryError;

/// Caller identity
///
/// The nil UUID is the zero identity. It is never a valid grant target,
/// holder or owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(pub Uuid);

impl Identity {
    /// The zero identity
    pub const ZERO: Identity = Identity(Uuid::nil());

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Derive an identity deterministically from 32 bytes of entropy
    pub fn new_from_entropy(entropy: [u8; 32]) -> Self {
        let digest = blake3::hash(&entropy);
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        Self(Uuid::from_bytes(bytes))
    }

    /// Derive an identity from a human-readable name.
    ///
    /// The same name always yields the same identity, which lets scenario
    /// files and tests refer to actors as `"alice"` or `"owner"`.
    pub fn from_name(name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"refreg-identity:");
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        Self(Uuid::from_bytes(bytes))
    }

    /// Whether this is the zero identity
    pub fn is_zero(&self) -> bool {
        self.0.is_nil()
    }

    /// Get the inner UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id-{}", hex::encode(&self.0.as_bytes()[..8]))
    }
}

impl From<Uuid> for Identity {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<Identity> for Uuid {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

/// Record identifier
///
/// Allocated from 1 upwards and never reused, so `RecordId(0)` never names a
/// live record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// First id handed out by a fresh registry
    pub const FIRST: RecordId = RecordId(1);

    /// Exclusive upper bound of the next-id counter; never allocated
    pub const LIMIT: RecordId = RecordId(u64::MAX);

    /// Create a record id
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw numeric value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The id that follows this one, or `None` once the id space is used up
    pub fn checked_next(&self) -> Option<Self> {
        self.0
            .checked_add(1)
            .filter(|next| *next < Self::LIMIT.0)
            .map(Self)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for RecordId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        digits
            .parse::<u64>()
            .map(RecordId)
            .map_err(|e| RegistryError::invalid(format!("invalid record id '{s}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_identities_are_stable_and_distinct() {
        assert_eq!(Identity::from_name("alice"), Identity::from_name("alice"));
        assert_ne!(Identity::from_name("alice"), Identity::from_name("bob"));
        assert!(!Identity::from_name("alice").is_zero());
    }

    #[test]
    fn zero_identity_is_nil() {
        assert!(Identity::ZERO.is_zero());
        assert_eq!(Identity::from_bytes([0u8; 16]), Identity::ZERO);
    }

    #[test]
    fn record_id_parses_with_and_without_hash() {
        assert_eq!("7".parse::<RecordId>().ok(), Some(RecordId(7)));
        assert_eq!("#7".parse::<RecordId>().ok(), Some(RecordId(7)));
        assert!("seven".parse::<RecordId>().is_err());
        assert_eq!(RecordId(7).to_string(), "#7");
    }

    #[test]
    fn checked_next_stops_below_limit() {
        assert_eq!(RecordId(1).checked_next(), Some(RecordId(2)));
        assert_eq!(
            RecordId(u64::MAX - 2).checked_next(),
            Some(RecordId(u64::MAX - 1))
        );
        assert_eq!(RecordId(u64::MAX - 1).checked_next(), None);
        assert_eq!(RecordId::LIMIT.checked_next(), None);
    }
}
