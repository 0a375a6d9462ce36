//! Engine configuration

use approval_condition::Limits;
use approval_types::DEFAULT_TIMEOUT_HOURS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Workflow engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hours granted to the first node when a flow sets no timeout
    pub default_timeout_hours: u32,

    /// Prefix of generated instance numbers
    pub instance_no_prefix: String,

    /// Approver name prefix used when the user directory has no entry
    pub placeholder_name_prefix: String,

    /// Bounds applied to gate expressions
    pub condition: Limits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_hours: DEFAULT_TIMEOUT_HOURS,
            instance_no_prefix: "AP".to_string(),
            placeholder_name_prefix: "User#".to_string(),
            condition: Limits::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
