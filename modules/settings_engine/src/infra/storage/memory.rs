//! In-memory storage adapter
//!
//! Entries live in a shared byte map so several adapters with different
//! prefixes can observe each other's data, like namespaces over one backing
//! store.

use super::mapper::{decode_value, encode_value, entry_key};
use crate::config::Config;
use crate::contract::SettingValue;
use crate::domain::repository::StorageAdapter;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct InMemoryStorage {
    prefix: String,
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Adapter namespaced by `config.storage_prefix`
    pub fn from_config(config: &Config) -> Self {
        Self::with_prefix(config.storage_prefix.clone())
    }

    /// Another adapter over the same backing map with its own prefix
    pub fn share_with_prefix(&self, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: self.entries.clone(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Write raw bytes for `key` under this prefix, bypassing encoding
    pub fn insert_raw(&self, key: &str, raw: impl Into<Vec<u8>>) {
        self.entries
            .write()
            .insert(entry_key(&self.prefix, key), raw.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .contains_key(&entry_key(&self.prefix, key))
    }

    /// Number of entries in the backing map, across all prefixes
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageAdapter for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<SettingValue>> {
        let name = entry_key(&self.prefix, key);
        let raw = self.entries.read().get(&name).cloned();
        let Some(raw) = raw else {
            return Ok(None);
        };

        match decode_value(&raw) {
            Some(value) => Ok(Some(value)),
            None => {
                tracing::warn!(entry = %name, "purging undecodable persisted entry");
                self.entries.write().remove(&name);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &SettingValue) -> Result<()> {
        let encoded = encode_value(value)?;
        self.entries
            .write()
            .insert(entry_key(&self.prefix, key), encoded.into_bytes());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(&entry_key(&self.prefix, key));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let prefix = &self.prefix;
        self.entries.write().retain(|name, _| !name.starts_with(prefix.as_str()));
        Ok(())
    }
}
