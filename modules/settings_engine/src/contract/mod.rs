//! Contract layer - public types shared across the crate
//!
//! Transport-agnostic models, the error type and the native client trait.

pub mod client;
pub mod error;
pub mod model;

pub use client::SettingsApi;
pub use error::SettingsError;
pub use model::{
    Configuration, Controller, Definition, Grouping, Relevance, SettingKey, SettingValue,
    Snapshot, SnapshotPredicate, Structure, StructureItem, Validator, ValueCheck, ValueType,
};
