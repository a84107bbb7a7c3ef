//! Settings Engine
//!
//! Typed, persisted application settings with conditional relevance.
//!
//! - `contract`: definitions, values, structure and the error type
//! - `domain::relevance`: which settings are active for a snapshot, and
//!   dependency analysis over relevance conditions
//! - `domain::store`: validate → persist → apply/notify pipeline with
//!   throttled notifications
//! - `infra::storage`: in-memory and SeaORM storage adapters
//!
//! ```ignore
//! let configuration = Configuration::builder()
//!     .tab("audio", "Audio")
//!     .setting("audio.enabled").boolean(true).done()?
//!     .setting("audio.volume").number(50.0)
//!     .relevant_when(Relevance::depends_on("audio.enabled")).done()?
//!     .end()
//!     .build();
//!
//! let store = Store::new(Config::default(), Some(Arc::new(InMemoryStorage::new())));
//! store.initialize(&configuration).await?;
//! store.set_value("audio.enabled", false).await?;
//! ```

#![forbid(unsafe_code)]

// Public exports
pub mod contract;
pub use contract::{
    client::SettingsApi, error::SettingsError, Configuration, Controller, Definition, Grouping,
    Relevance, SettingKey, SettingValue, Snapshot, Structure, StructureItem, Validator, ValueType,
};

pub mod config;
pub use config::Config;

pub mod api;
pub use api::native::NativeClient;

pub mod domain;
pub use domain::{StorageAdapter, Store, SubscriptionId};

pub mod infra;
pub use infra::storage::{InMemoryStorage, SeaOrmStorage};
