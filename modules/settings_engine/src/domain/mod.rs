//! Domain layer - relevance engine, validation and the settings store

pub mod builder;
pub mod events;
pub mod relevance;
pub mod repository;
pub mod store;
pub mod throttle;
pub mod validation;

pub use builder::{ConfigBuilder, GroupBuilder, SettingBuilder, SettingParent, TabBuilder};
pub use events::SubscriptionId;
pub use relevance::{RelevanceGraph, RelevanceReport};
pub use repository::StorageAdapter;
pub use store::Store;
pub use validation::ConsistencyReport;
