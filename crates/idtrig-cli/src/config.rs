//! # CLI Configuration
//!
//! Optional YAML file (`--config`) supplying the declarative rule library,
//! the RapidSetup business processes, and the audit trail capacity:
//!
//! ```yaml
//! business_processes:
//!   joiner:
//!     condition: { kind: attribute_changed, attribute: hired }
//!   leaver:
//!     enabled: false
//! rules:
//!   AlwaysTrueRule: { kind: constant, value: true }
//! audit:
//!   max_entries: 500
//! ```

use std::path::{Path, PathBuf};

use idtrig_engine::audit::DEFAULT_MAX_ENTRIES;
use idtrig_engine::{BusinessProcessConfig, RuleLibrary, TriggerProcessor};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid configuration YAML.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// RapidSetup business processes.
    pub business_processes: BusinessProcessConfig,
    /// Declarative rules.
    pub rules: RuleLibrary,
    /// Audit trail settings.
    pub audit: AuditConfig,
}

/// Audit trail settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Maximum entries held before trimming.
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CliConfig {
    /// Load from `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse YAML text. An empty document is the default configuration.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Build a processor from this configuration.
    pub fn into_processor(self) -> TriggerProcessor {
        TriggerProcessor::declarative(self.rules, self.business_processes)
            .with_audit_capacity(self.audit.max_entries)
    }
}
