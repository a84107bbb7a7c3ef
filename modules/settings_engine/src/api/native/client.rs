//! Native client implementation - wraps the store for in-process calls

use crate::contract::{SettingKey, SettingValue, SettingsApi, SettingsError, Snapshot, Structure};
use crate::domain::Store;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Native client that calls the store directly
///
/// Carries the presentation structure so relevance queries need no extra
/// arguments.
#[derive(Clone)]
pub struct NativeClient {
    store: Store,
    structure: Arc<Structure>,
}

impl NativeClient {
    pub fn new(store: Store, structure: Structure) -> Self {
        Self {
            store,
            structure: Arc::new(structure),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

#[async_trait]
impl SettingsApi for NativeClient {
    async fn get_value(&self, key: &str) -> Result<SettingValue, SettingsError> {
        self.store
            .get_value(key)
            .ok_or_else(|| SettingsError::UnknownSetting {
                key: key.to_string(),
            })
    }

    async fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    async fn set_value(&self, key: &str, value: SettingValue) -> Result<(), SettingsError> {
        self.store.set_value(key, value).await
    }

    async fn set_values(&self, values: Snapshot) -> Result<(), SettingsError> {
        self.store.set_values(values).await
    }

    async fn reset_to_default(&self, key: &str) -> Result<(), SettingsError> {
        self.store.reset_to_default(key).await
    }

    async fn reset_all_to_defaults(&self) -> Result<(), SettingsError> {
        self.store.reset_all_to_defaults().await
    }

    async fn is_relevant(&self, key: &str) -> bool {
        self.store.is_relevant(key, &self.structure)
    }

    async fn visible_settings(&self) -> BTreeSet<SettingKey> {
        self.store.visible_settings(&self.structure)
    }
}
