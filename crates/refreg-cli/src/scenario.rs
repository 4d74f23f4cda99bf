//! Declarative registry scenarios
//!
//! A scenario names its actors by string; each name maps to a stable
//! [`Identity`] derived with [`Identity::from_name`]. Steps run in order and
//! each states its expected outcome: `ok` (the default) or the code of the
//! error the step must fail with, e.g. `read-only` or `unauthorized`.
//!
//! ```toml
//! owner = "alice"
//!
//! [metadata]
//! name = "token manager update"
//!
//! [[steps]]
//! action = "create"
//! actor = "alice"
//! uri = "ipfs://a"
//! ```

use anyhow::{bail, Context};
use refreg_registry::{
    Identity, RecordId, Registry, RegistryError, RoleKind, RoleScope, RunState,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const EXPECT_OK: &str = "ok";

/// Scenario file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// Scenario metadata
    pub metadata: ScenarioMetadata,
    /// Actor name of the registry owner, when starting from scratch
    pub owner: String,
    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

/// Scenario metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMetadata {
    /// Scenario name
    pub name: String,
    /// Description
    pub description: Option<String>,
}

/// One step with its expected outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Operation to perform
    #[serde(flatten)]
    pub action: Action,
    /// `ok` or an error code
    #[serde(default = "default_expect")]
    pub expect: String,
}

fn default_expect() -> String {
    EXPECT_OK.to_string()
}

/// Registry operation invoked by a step.
///
/// Query actions take an optional `equals` value checked against the
/// result. Fields name actors, records and roles as in scenario files.
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    /// Mint a record, optionally for another holder
    Create {
        actor: String,
        uri: String,
        holder: Option<String>,
    },
    /// Destroy a record
    Destroy { actor: String, record: u64 },
    /// Replace a record's content URI
    UpdateContent {
        actor: String,
        record: u64,
        uri: String,
    },
    /// Read a record's content URI
    ReadContent { record: u64, equals: Option<String> },
    /// Read a record's sequence number
    ReadSeqNum { record: u64, equals: Option<u64> },
    /// Set a record's own reference spec
    UpdateRefSpec {
        actor: String,
        record: u64,
        spec: String,
    },
    /// Read a record's effective reference spec
    ReadRefSpec { record: u64, equals: Option<String> },
    /// Replace the registry default reference spec
    UpdateDefaultRefSpec { actor: String, spec: String },
    /// Grant a role
    Grant {
        actor: String,
        role: String,
        target: String,
        record: Option<u64>,
    },
    /// Revoke a role
    Revoke {
        actor: String,
        role: String,
        target: String,
        record: Option<u64>,
    },
    /// Membership query
    HasRole {
        role: String,
        target: String,
        record: Option<u64>,
        equals: Option<bool>,
    },
    /// Member count of a role
    RoleCount {
        actor: String,
        role: String,
        record: Option<u64>,
        equals: Option<usize>,
    },
    /// Member of a role at an enumeration index; `equals` names an actor
    MemberAt {
        actor: String,
        role: String,
        index: usize,
        record: Option<u64>,
        equals: Option<String>,
    },
    /// Move the run state
    SetState { actor: String, state: String },
    /// Read the run state
    GetState { equals: Option<String> },
    /// Hand registry ownership to another actor
    TransferOwnership { actor: String, to: String },
    /// Holder-initiated record transfer
    Transfer {
        actor: String,
        record: u64,
        to: String,
    },
}

impl Action {
    /// Action name as written in scenario files
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Destroy { .. } => "destroy",
            Self::UpdateContent { .. } => "update-content",
            Self::ReadContent { .. } => "read-content",
            Self::ReadSeqNum { .. } => "read-seq-num",
            Self::UpdateRefSpec { .. } => "update-ref-spec",
            Self::ReadRefSpec { .. } => "read-ref-spec",
            Self::UpdateDefaultRefSpec { .. } => "update-default-ref-spec",
            Self::Grant { .. } => "grant",
            Self::Revoke { .. } => "revoke",
            Self::HasRole { .. } => "has-role",
            Self::RoleCount { .. } => "role-count",
            Self::MemberAt { .. } => "member-at",
            Self::SetState { .. } => "set-state",
            Self::GetState { .. } => "get-state",
            Self::TransferOwnership { .. } => "transfer-ownership",
            Self::Transfer { .. } => "transfer",
        }
    }
}

impl ScenarioFile {
    /// Load a TOML scenario
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Parse a TOML scenario
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let scenario: Self = toml::from_str(content).context("invalid scenario")?;
        if scenario.owner.is_empty() {
            bail!("scenario owner must not be empty");
        }
        Ok(scenario)
    }

    /// Identity of the owner actor
    pub fn owner_identity(&self) -> Identity {
        actor(&self.owner)
    }
}

/// Result of one executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Zero-based position in the scenario
    pub index: usize,
    /// Action name
    pub action: &'static str,
    /// Observed outcome: `ok` or an error code
    pub outcome: String,
    /// Value returned by a query or create
    pub value: Option<String>,
}

fn actor(name: &str) -> Identity {
    Identity::from_name(name)
}

fn scope(record: Option<u64>) -> RoleScope {
    record.map(|id| RoleScope::Record(RecordId(id))).unwrap_or_default()
}

fn check<T: PartialEq + std::fmt::Display>(
    observed: T,
    expected: Option<T>,
) -> refreg_registry::Result<Option<String>> {
    match expected {
        Some(expected) if expected != observed => Err(RegistryError::invalid(format!(
            "expected {expected}, observed {observed}"
        ))),
        _ => Ok(Some(observed.to_string())),
    }
}

fn apply(registry: &mut Registry, action: &Action) -> refreg_registry::Result<Option<String>> {
    match action {
        Action::Create {
            actor: caller,
            uri,
            holder,
        } => {
            let holder = holder.as_deref().map_or_else(|| actor(caller), actor);
            let id = registry.create_for(actor(caller), holder, uri.clone())?;
            Ok(Some(id.to_string()))
        }
        Action::Destroy {
            actor: caller,
            record,
        } => registry.destroy(actor(caller), RecordId(*record)).map(|()| None),
        Action::UpdateContent {
            actor: caller,
            record,
            uri,
        } => registry
            .update_content(actor(caller), RecordId(*record), uri.clone())
            .map(|seq| Some(seq.to_string())),
        Action::ReadContent { record, equals } => {
            check(registry.read_content(RecordId(*record))?, equals.clone())
        }
        Action::ReadSeqNum { record, equals } => {
            check(registry.read_seq_num(RecordId(*record))?, *equals)
        }
        Action::UpdateRefSpec {
            actor: caller,
            record,
            spec,
        } => registry
            .update_ref_spec(actor(caller), RecordId(*record), spec.clone())
            .map(|()| None),
        Action::ReadRefSpec { record, equals } => {
            check(registry.read_ref_spec(RecordId(*record))?, equals.clone())
        }
        Action::UpdateDefaultRefSpec {
            actor: caller,
            spec,
        } => registry
            .update_default_ref_spec(actor(caller), spec.clone())
            .map(|()| None),
        Action::Grant {
            actor: caller,
            role,
            target,
            record,
        } => registry
            .grant_role(actor(caller), role.parse()?, actor(target), scope(*record))
            .map(|()| None),
        Action::Revoke {
            actor: caller,
            role,
            target,
            record,
        } => registry
            .revoke_role(actor(caller), role.parse()?, actor(target), scope(*record))
            .map(|()| None),
        Action::HasRole {
            role,
            target,
            record,
            equals,
        } => {
            let role: RoleKind = role.parse()?;
            check(
                registry.has_role(role, &actor(target), scope(*record))?,
                *equals,
            )
        }
        Action::RoleCount {
            actor: caller,
            role,
            record,
            equals,
        } => check(
            registry.role_count(actor(caller), role.parse()?, scope(*record))?,
            *equals,
        ),
        Action::MemberAt {
            actor: caller,
            role,
            index,
            record,
            equals,
        } => check(
            registry.role_member_at(actor(caller), role.parse()?, *index, scope(*record))?,
            equals.as_deref().map(actor),
        ),
        Action::SetState {
            actor: caller,
            state,
        } => {
            let state: RunState = state.parse()?;
            registry
                .set_running_state(actor(caller), state)
                .map(|()| None)
        }
        Action::GetState { equals } => {
            let expected = equals.as_deref().map(str::parse::<RunState>).transpose()?;
            check(registry.running_state()?, expected)
        }
        Action::TransferOwnership { actor: caller, to } => registry
            .transfer_ownership(actor(caller), actor(to))
            .map(|()| None),
        Action::Transfer {
            actor: caller,
            record,
            to,
        } => registry
            .transfer(actor(caller), RecordId(*record), actor(to))
            .map(|()| None),
    }
}

/// Run every step, failing at the first outcome that differs from its
/// expectation
pub fn run(registry: &mut Registry, scenario: &ScenarioFile) -> anyhow::Result<Vec<StepReport>> {
    info!(
        scenario = %scenario.metadata.name,
        steps = scenario.steps.len(),
        "running scenario"
    );
    let mut reports = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let result = apply(registry, &step.action);
        let (outcome, value) = match &result {
            Ok(value) => (EXPECT_OK.to_string(), value.clone()),
            Err(err) => (err.code().to_string(), None),
        };
        debug!(index, action = step.action.name(), %outcome, "step executed");

        if outcome != step.expect {
            let detail = match result {
                Err(err) => format!(": {err}"),
                Ok(_) => String::new(),
            };
            bail!(
                "step {index} ({}) expected {}, got {outcome}{detail}",
                step.action.name(),
                step.expect
            );
        }
        reports.push(StepReport {
            index,
            action: step.action.name(),
            outcome,
            value,
        });
    }
    Ok(reports)
}
