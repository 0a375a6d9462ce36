//! CLI error types

use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] approval_engine::ConfigError),

    /// Flow definition file could not be parsed
    #[error("Flow file error: {0}")]
    FlowFile(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Approval(#[from] approval_types::ApprovalError),

    #[error("Condition error: {0}")]
    Condition(#[from] approval_condition::ConditionError),

    #[error("Storage error: {0}")]
    Storage(#[from] approval_storage::StorageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML rendering error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
