//! Error types for the content automation engine.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Item not found: {0}")]
    ItemNotFound(u64),

    #[error("Comment plan not found for item {0}")]
    PlanNotFound(u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            err.to_string(),
        ))
    }
}

/// Errors surfaced by the automation core.
///
/// Only [`AutomationError::PersistenceFailure`] and [`AutomationError::StorageError`]
/// are fatal-class; everything else is recorded and the cycle moves on.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    #[error("Provider returned nothing usable: {0}")]
    ProviderEmpty(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("Side effect failed: {0}")]
    SideEffectFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl AutomationError {
    /// Whether this error should page the operator.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AutomationError::PersistenceFailure(_) | AutomationError::StorageError(_)
        )
    }

    /// Short stable label used in logs and the status snapshot.
    pub fn kind(&self) -> &'static str {
        match self {
            AutomationError::ConfigurationMissing(_) => "configuration_missing",
            AutomationError::ProviderFailure(_) => "provider_failure",
            AutomationError::ProviderEmpty(_) => "provider_empty",
            AutomationError::PersistenceFailure(_) => "persistence_failure",
            AutomationError::SideEffectFailure(_) => "side_effect_failure",
            AutomationError::ConfigError(_) => "config_error",
            AutomationError::StorageError(_) => "storage_error",
        }
    }
}

impl From<config::ConfigError> for AutomationError {
    fn from(err: config::ConfigError) -> Self {
        AutomationError::ConfigError(err.to_string())
    }
}
