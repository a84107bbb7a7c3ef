//! Contract error types for the settings engine
//!
//! These errors are transport-agnostic. They are `Clone` so the store can keep
//! the last error while also returning it to the caller.

use super::model::{SettingKey, ValueType};

/// Settings engine errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    /// A definition is missing a required part (key, type or default)
    #[error("Incomplete definition '{key}': missing {missing}")]
    IncompleteDefinition { key: SettingKey, missing: String },

    /// A definition is complete but inconsistent (e.g. default fails its validator)
    #[error("Invalid definition '{key}': {reason}")]
    InvalidDefinition { key: SettingKey, reason: String },

    /// No controller is registered for the key
    #[error("Unknown setting: {key}")]
    UnknownSetting { key: SettingKey },

    /// Candidate value has the wrong type
    #[error("Type mismatch for '{key}': expected {expected}, got {actual}")]
    TypeMismatch {
        key: SettingKey,
        expected: ValueType,
        actual: ValueType,
    },

    /// Candidate value was rejected by the definition's validator
    #[error("Validation error for '{key}': {message}")]
    Validation { key: SettingKey, message: String },

    /// Candidate value failed JSON Schema validation
    #[error("Schema validation failed for '{key}': {}", errors.join(", "))]
    SchemaValidation { key: SettingKey, errors: Vec<String> },

    /// Storage adapter rejected a read, write, delete or clear
    #[error("Persistence error for '{key}': {message}")]
    Persistence { key: SettingKey, message: String },

    /// Storage adapter call exceeded the configured timeout
    #[error("Persistence timed out for '{key}'")]
    Timeout { key: SettingKey },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SettingsError {
    /// True for errors raised while checking a candidate value
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownSetting { .. }
                | Self::TypeMismatch { .. }
                | Self::Validation { .. }
                | Self::SchemaValidation { .. }
        )
    }

    /// True for errors raised at the storage boundary
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::Timeout { .. })
    }

    /// Key the error refers to, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::IncompleteDefinition { key, .. }
            | Self::InvalidDefinition { key, .. }
            | Self::UnknownSetting { key }
            | Self::TypeMismatch { key, .. }
            | Self::Validation { key, .. }
            | Self::SchemaValidation { key, .. }
            | Self::Persistence { key, .. }
            | Self::Timeout { key } => Some(key),
            Self::Internal(_) => None,
        }
    }

    pub(crate) fn persistence(key: impl Into<SettingKey>, error: &anyhow::Error) -> Self {
        Self::Persistence {
            key: key.into(),
            message: format!("{error:#}"),
        }
    }
}
