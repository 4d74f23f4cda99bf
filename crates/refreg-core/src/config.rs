//! Registry configuration
//!
//! Configuration is layered: defaults, then a TOML or JSON file, then
//! `REFREG_*` environment variables. The result is validated before a
//! registry is built from it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{RegistryError, Result};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "REFREG_";

/// Loading and validation contract for configuration types
pub trait LoadableConfig: Clone + Default + Sized {
    /// Load configuration from a `.toml` or `.json` file
    fn load_from_file(path: &Path) -> Result<Self>;

    /// Apply `(key, value)` overrides. Keys carry the [`ENV_PREFIX`].
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>;

    /// Apply overrides from the process environment
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()>;
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Initial registry-wide reference spec
    pub default_ref_spec: String,
    /// Upper bound on retained in-memory events; `None` keeps everything
    pub event_history_limit: Option<usize>,
    /// Log every committed event through `tracing`
    pub trace_events: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_ref_spec: String::new(),
            event_history_limit: None,
            trace_events: true,
        }
    }
}

impl RegistryConfig {
    /// Load from file, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl LoadableConfig for RegistryConfig {
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| RegistryError::config(format!("Invalid TOML: {e}"))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RegistryError::config(format!("Invalid JSON: {e}"))),
            _ => Err(RegistryError::config(format!(
                "Unsupported config format: {}",
                path.display()
            ))),
        }
    }

    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "DEFAULT_REF_SPEC" => self.default_ref_spec = value,
                "EVENT_HISTORY_LIMIT" => {
                    self.event_history_limit = if value.is_empty() {
                        None
                    } else {
                        Some(value.parse().map_err(|_| {
                            RegistryError::config(format!(
                                "Invalid number in {ENV_PREFIX}EVENT_HISTORY_LIMIT: {value}"
                            ))
                        })?)
                    };
                }
                "TRACE_EVENTS" => {
                    self.trace_events = value.parse().map_err(|_| {
                        RegistryError::config(format!(
                            "Invalid boolean in {ENV_PREFIX}TRACE_EVENTS: {value}"
                        ))
                    })?;
                }
                _ => tracing::debug!(key = %key, "ignoring unrecognised registry override"),
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.event_history_limit == Some(0) {
            return Err(RegistryError::config(
                "event_history_limit must be at least 1 when set",
            ));
        }
        Ok(())
    }
}
