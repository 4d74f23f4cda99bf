//! Unified error type for registry operations
//!
//! Every operation either commits all of its effects or fails with one of
//! these variants and commits nothing. None of them are retried internally.

use serde::{Deserialize, Serialize};

use crate::identifiers::RecordId;
use crate::run_state::RunState;

/// Unified error type for all registry operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RegistryError {
    /// Role or ownership check failed
    #[error("Unauthorized: {reason}")]
    Unauthorized {
        /// Role-specific denial reason, surfaced verbatim
        reason: String,
    },

    /// The record does not exist (never created or destroyed)
    #[error("Record not found: {id}")]
    RecordNotFound {
        /// Requested record
        id: RecordId,
    },

    /// Content URI was empty on create
    #[error("Content URI must not be empty")]
    EmptyContent,

    /// Zero identity passed where a real identity is required
    #[error("Invalid identity: the zero identity cannot hold roles or records")]
    InvalidIdentity,

    /// Registry is halted
    #[error("Registry is halted")]
    Halted,

    /// Registry is paused
    #[error("Registry is paused")]
    Paused,

    /// Registry is read-only
    #[error("Registry is read-only")]
    ReadOnly,

    /// Unknown role name or role member lookup out of range
    #[error("Unknown role: {message}")]
    UnknownRole {
        /// What was looked up
        message: String,
    },

    /// Run-state transition outside the lifecycle table
    #[error("Invalid run-state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: RunState,
        /// Requested state
        to: RunState,
    },

    /// Malformed input (identifiers, names)
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Snapshot could not be restored
    #[error("Snapshot error: {message}")]
    Snapshot {
        /// Error message describing the inconsistency
        message: String,
    },
}

impl RegistryError {
    /// Create an unauthorized error with a verbatim denial reason
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Create a record-not-found error
    pub fn record_not_found(id: RecordId) -> Self {
        Self::RecordNotFound { id }
    }

    /// Create an unknown-role error
    pub fn unknown_role(message: impl Into<String>) -> Self {
        Self::UnknownRole {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a snapshot error
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Stable kebab-case code for this error kind.
    ///
    /// Scenario files name expected failures with these codes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::RecordNotFound { .. } => "record-not-found",
            Self::EmptyContent => "empty-content",
            Self::InvalidIdentity => "invalid-identity",
            Self::Halted => "halted",
            Self::Paused => "paused",
            Self::ReadOnly => "read-only",
            Self::UnknownRole { .. } => "unknown-role",
            Self::InvalidTransition { .. } => "invalid-transition",
            Self::Invalid { .. } => "invalid",
            Self::Config { .. } => "config",
            Self::Snapshot { .. } => "snapshot",
        }
    }

    /// Denial reason when this is an `Unauthorized` error
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { reason } => Some(reason),
            _ => None,
        }
    }

    /// Whether this error came from the run-state gate
    pub fn is_gate_denial(&self) -> bool {
        matches!(self, Self::Halted | Self::Paused | Self::ReadOnly)
    }
}

/// Standard Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::snapshot(err.to_string())
    }
}

impl From<toml::de::Error> for RegistryError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}
