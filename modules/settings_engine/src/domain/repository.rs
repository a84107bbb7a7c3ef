//! Storage adapter trait for setting persistence
//!
//! The store treats an adapter as an opaque async value map. Implementations
//! are in infra/storage.

use crate::contract::SettingValue;
use anyhow::Result;
use async_trait::async_trait;

/// Async key/value persistence for setting values
///
/// Implementations namespace their entries (`prefix + key`), own the
/// serialization format, and report "not found" as `None`. An entry that
/// cannot be decoded must be purged and reported as `None`.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<SettingValue>>;

    /// Write a value
    async fn set(&self, key: &str, value: &SettingValue) -> Result<()>;

    /// Remove a value; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry under this adapter's namespace
    async fn clear(&self) -> Result<()>;
}
