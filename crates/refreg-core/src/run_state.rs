//! Run-state gate
//!
//! A four-state lifecycle consulted before every registry operation:
//!
//! ```text
//! Ok <-> ReadOnly <-> Paused <-> Ok
//!  \        |          /
//!   +----> Halted <---+        (terminal)
//! ```
//!
//! The gate only knows which transitions exist and what each state blocks.
//! Who may request a transition is decided by the authorization layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{RegistryError, Result};

/// Global lifecycle state of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    /// Reads and writes allowed
    #[default]
    Ok,
    /// Reads allowed, writes rejected
    ReadOnly,
    /// Content reads and writes rejected; privileged reads still allowed
    Paused,
    /// Everything rejected, forever
    Halted,
}

impl RunState {
    /// All states, in declaration order
    pub const ALL: [RunState; 4] = [
        RunState::Ok,
        RunState::ReadOnly,
        RunState::Paused,
        RunState::Halted,
    ];

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Ok => "ok",
            RunState::ReadOnly => "read-only",
            RunState::Paused => "paused",
            RunState::Halted => "halted",
        }
    }

    /// Whether the lifecycle table has an edge from `self` to `to`.
    ///
    /// Every non-terminal state reaches every state, itself included as a
    /// no-op; Halted reaches nothing.
    pub fn can_transition_to(&self, _to: RunState) -> bool {
        !matches!(self, RunState::Halted)
    }

    /// Whether entering this state needs the registry owner rather than any
    /// registry manager
    pub fn requires_owner(&self) -> bool {
        matches!(self, RunState::Halted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunState {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "ok" => Ok(RunState::Ok),
            "read-only" | "readonly" => Ok(RunState::ReadOnly),
            "paused" => Ok(RunState::Paused),
            "halted" => Ok(RunState::Halted),
            other => Err(RegistryError::invalid(format!("unknown run state '{other}'"))),
        }
    }
}

/// Owner of the registry's run state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStateGate {
    state: RunState,
}

impl RunStateGate {
    /// Create a gate in the `Ok` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a gate in a previously persisted state
    pub fn with_state(state: RunState) -> Self {
        Self { state }
    }

    /// Current state, without any guard
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Fails with `Halted` iff the registry is halted
    pub fn assert_not_halted(&self) -> Result<()> {
        match self.state {
            RunState::Halted => Err(RegistryError::Halted),
            _ => Ok(()),
        }
    }

    /// Fails with `Halted` or `Paused`
    pub fn assert_readable(&self) -> Result<()> {
        match self.state {
            RunState::Halted => Err(RegistryError::Halted),
            RunState::Paused => Err(RegistryError::Paused),
            _ => Ok(()),
        }
    }

    /// Fails with `Halted`, `Paused` or `ReadOnly`
    pub fn assert_writeable(&self) -> Result<()> {
        match self.state {
            RunState::Halted => Err(RegistryError::Halted),
            RunState::Paused => Err(RegistryError::Paused),
            RunState::ReadOnly => Err(RegistryError::ReadOnly),
            RunState::Ok => Ok(()),
        }
    }

    /// Check that `to` is reachable without applying it. The only missing
    /// edges leave Halted, which reports `Halted` like every other call.
    pub fn check_transition(&self, to: RunState) -> Result<()> {
        self.assert_not_halted()?;
        debug_assert!(self.state.can_transition_to(to));
        Ok(())
    }

    /// Move to `to`, returning the previous state
    pub fn transition(&mut self, to: RunState) -> Result<RunState> {
        self.check_transition(to)?;
        let previous = self.state;
        self.state = to;
        tracing::debug!(from = %previous, to = %to, "run state changed");
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_match_state_table() {
        let cases = [
            (RunState::Ok, None, None, None),
            (
                RunState::ReadOnly,
                None,
                None,
                Some(RegistryError::ReadOnly),
            ),
            (
                RunState::Paused,
                None,
                Some(RegistryError::Paused),
                Some(RegistryError::Paused),
            ),
            (
                RunState::Halted,
                Some(RegistryError::Halted),
                Some(RegistryError::Halted),
                Some(RegistryError::Halted),
            ),
        ];

        for (state, not_halted, readable, writeable) in cases {
            let gate = RunStateGate::with_state(state);
            assert_eq!(gate.assert_not_halted().err(), not_halted, "{state}");
            assert_eq!(gate.assert_readable().err(), readable, "{state}");
            assert_eq!(gate.assert_writeable().err(), writeable, "{state}");
        }
    }

    #[test]
    fn halted_is_terminal() {
        let mut gate = RunStateGate::new();
        assert_eq!(gate.transition(RunState::Halted), Ok(RunState::Ok));
        for to in RunState::ALL {
            assert_eq!(gate.transition(to), Err(RegistryError::Halted));
        }
        assert_eq!(gate.state(), RunState::Halted);
    }

    #[test]
    fn read_only_and_paused_are_reversible() {
        let mut gate = RunStateGate::new();
        gate.transition(RunState::ReadOnly).ok();
        gate.transition(RunState::Paused).ok();
        gate.transition(RunState::ReadOnly).ok();
        assert_eq!(gate.transition(RunState::Ok), Ok(RunState::ReadOnly));
        assert_eq!(gate.state(), RunState::Ok);
    }

    #[test]
    fn transition_table_is_closed_only_at_halted() {
        for from in RunState::ALL {
            for to in RunState::ALL {
                assert_eq!(from.can_transition_to(to), from != RunState::Halted);
            }
        }
    }

    #[test]
    fn only_halt_requires_owner() {
        assert!(RunState::Halted.requires_owner());
        assert!(!RunState::Paused.requires_owner());
        assert!(!RunState::ReadOnly.requires_owner());
        assert!(!RunState::Ok.requires_owner());
    }

    #[test]
    fn parses_canonical_names() {
        for state in RunState::ALL {
            assert_eq!(state.as_str().parse::<RunState>(), Ok(state));
        }
        assert_eq!("READ_ONLY".parse::<RunState>(), Ok(RunState::ReadOnly));
        assert!("frozen".parse::<RunState>().is_err());
    }
}
