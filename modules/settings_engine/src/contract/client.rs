//! Native client trait for in-process consumers
//!
//! Consumers depend on this trait rather than on the store, so a store can be
//! wrapped (or replaced in tests) without touching call sites.

use super::{
    error::SettingsError,
    model::{SettingKey, SettingValue, Snapshot},
};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Settings API for in-process communication
#[async_trait]
pub trait SettingsApi: Send + Sync {
    // ===== Reads =====

    /// Current value of a setting
    async fn get_value(&self, key: &str) -> Result<SettingValue, SettingsError>;

    /// Full current snapshot
    async fn snapshot(&self) -> Snapshot;

    // ===== Mutations =====

    /// Validate, persist and apply one value
    async fn set_value(&self, key: &str, value: SettingValue) -> Result<(), SettingsError>;

    /// Validate, persist and apply a batch atomically
    async fn set_values(&self, values: Snapshot) -> Result<(), SettingsError>;

    /// Reset one setting to its default
    async fn reset_to_default(&self, key: &str) -> Result<(), SettingsError>;

    /// Reset every setting to its default
    async fn reset_all_to_defaults(&self) -> Result<(), SettingsError>;

    // ===== Relevance =====

    /// Whether the setting is currently relevant
    async fn is_relevant(&self, key: &str) -> bool;

    /// Currently relevant settings
    async fn visible_settings(&self) -> BTreeSet<SettingKey>;
}
