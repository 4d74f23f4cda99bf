//! Command handlers

use anyhow::{Context, Result};
use refreg_registry::{LoadableConfig, Registry, RegistryConfig, RegistrySnapshot};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::scenario::{self, ScenarioFile, StepReport};

/// Inputs of `refreg run`
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Scenario file
    pub scenario: PathBuf,
    /// Configuration file; defaults plus environment when absent
    pub config: Option<PathBuf>,
    /// Snapshot to start from instead of an empty registry
    pub state: Option<PathBuf>,
    /// Where to write the final snapshot
    pub save: Option<PathBuf>,
}

/// What a scenario run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Per-step outcomes
    pub steps: Vec<StepReport>,
    /// Events committed during the run, one JSON object per line
    pub event_lines: Vec<String>,
    /// Final registry state
    pub snapshot: RegistrySnapshot,
}

/// Resolve configuration from an optional file plus `REFREG_*` overrides
pub fn load_config(path: Option<&Path>) -> Result<RegistryConfig> {
    let config = match path {
        Some(path) => RegistryConfig::load(path)?,
        None => {
            let mut config = RegistryConfig::default();
            config.merge_with_env()?;
            config.validate()?;
            config
        }
    };
    Ok(config)
}

/// Execute a scenario against a fresh or restored registry
pub async fn run_scenario(options: &RunOptions) -> Result<RunSummary> {
    let config = load_config(options.config.as_deref())?;
    let scenario = ScenarioFile::load(&options.scenario).await?;

    let mut registry = match &options.state {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read state {}", path.display()))?;
            let snapshot = RegistrySnapshot::from_json(&json)?;
            if snapshot.owner != scenario.owner_identity() {
                warn!(
                    scenario_owner = %scenario.owner,
                    snapshot_owner = %snapshot.owner,
                    "scenario owner ignored; the restored registry keeps its own owner"
                );
            }
            Registry::restore(snapshot, &config)?
        }
        None => Registry::with_config(scenario.owner_identity(), &config)?,
    };

    let first_sequence = registry.change_log().next_sequence();
    let steps = scenario::run(&mut registry, &scenario)?;
    let event_lines = registry
        .change_log()
        .since(first_sequence.saturating_sub(1))
        .iter()
        .map(|event| event.to_json_line())
        .collect::<serde_json::Result<Vec<_>>>()?;
    let committed = registry.change_log().next_sequence() - first_sequence;
    if (event_lines.len() as u64) < committed {
        warn!(
            committed,
            retained = event_lines.len(),
            "event history limit dropped events of this run"
        );
    }

    let snapshot = registry.snapshot();
    if let Some(path) = &options.save {
        tokio::fs::write(path, snapshot.to_json()?)
            .await
            .with_context(|| format!("failed to write state {}", path.display()))?;
        info!(path = %path.display(), "saved registry state");
    }

    Ok(RunSummary {
        steps,
        event_lines,
        snapshot,
    })
}

/// Validate a configuration file, returning the effective configuration
pub fn check_config(path: &Path) -> Result<RegistryConfig> {
    let config = RegistryConfig::load(path)
        .with_context(|| format!("invalid configuration {}", path.display()))?;
    info!(path = %path.display(), "configuration is valid");
    Ok(config)
}
