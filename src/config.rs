//! Bridge configuration parsing and validation.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::process::ProcessEngineConfig;
use crate::session::SessionSettings;
use crate::{BridgeError, Result};

/// Engine launch configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Engine CLI binary.
    #[serde(default = "default_engine_program")]
    pub program: String,
    /// Arguments prepended before per-invocation flags.
    #[serde(default)]
    pub args: Vec<String>,
    /// Bound on one engine invocation in seconds; 0 means unbounded.
    #[serde(default)]
    pub timeout_seconds: u64,
    /// Commit completed edits automatically.
    #[serde(default = "default_true")]
    pub auto_commits: bool,
    /// Allow commits on a dirty working tree.
    #[serde(default = "default_true")]
    pub dirty_commits: bool,
    /// Edit-format hint passed to the engine.
    #[serde(default)]
    pub edit_format: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_engine_program(),
            args: Vec::new(),
            timeout_seconds: 0,
            auto_commits: true,
            dirty_commits: true,
            edit_format: None,
        }
    }
}

/// Search helper configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    /// Bound on one search subprocess.
    #[serde(default = "default_search_timeout")]
    pub timeout_seconds: u64,
    /// Default cap on returned matches.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_search_timeout(),
            max_results: default_max_results(),
        }
    }
}

fn default_engine_program() -> String {
    "aider".into()
}

fn default_true() -> bool {
    true
}

fn default_search_timeout() -> u64 {
    10
}

fn default_max_results() -> usize {
    50
}

fn default_model() -> String {
    "gpt-4".into()
}

/// Bridge configuration parsed from an optional TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BridgeConfig {
    /// Model identifier used when `initialize` does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Engine launch settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Search helper settings.
    #[serde(default)]
    pub search: SearchConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            engine: EngineConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] on parse or validation failure.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the file cannot be read or is
    /// invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|err| {
                    BridgeError::Config(format!("cannot read config: {err}"))
                })?;
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.engine.program.trim().is_empty() {
            return Err(BridgeError::Config("engine.program must not be empty".into()));
        }
        if self.search.max_results == 0 {
            return Err(BridgeError::Config(
                "search.max_results must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Engine invocation bound, `None` when unbounded.
    #[must_use]
    pub fn engine_timeout(&self) -> Option<Duration> {
        (self.engine.timeout_seconds > 0).then(|| Duration::from_secs(self.engine.timeout_seconds))
    }

    /// Launch configuration for the subprocess engine.
    #[must_use]
    pub fn process_engine_config(&self) -> ProcessEngineConfig {
        ProcessEngineConfig {
            program: self.engine.program.clone(),
            args: self.engine.args.clone(),
            timeout: self.engine_timeout(),
        }
    }

    /// Session tunables derived from this configuration.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            default_model: self.default_model.clone(),
            auto_commits: self.engine.auto_commits,
            dirty_commits: self.engine.dirty_commits,
            edit_format: self.engine.edit_format.clone(),
            search_timeout: Duration::from_secs(self.search.timeout_seconds),
            search_max_results: self.search.max_results,
        }
    }
}
