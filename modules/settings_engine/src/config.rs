//! Configuration for the settings engine

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for overrides (e.g. `SETTINGS_THROTTLE_WINDOW=250ms`)
pub const ENV_PREFIX: &str = "SETTINGS_";

/// Settings engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Window of the leading + trailing notification throttle
    #[serde(default = "default_throttle_window", with = "humantime_serde")]
    pub throttle_window: Duration,

    /// Namespace prefix for persisted entries
    ///
    /// Read by `InMemoryStorage::from_config` and `SeaOrmStorage::connect_with`.
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,

    /// Optional timeout around each storage adapter call
    #[serde(default, with = "humantime_serde")]
    pub persist_timeout: Option<Duration>,

    /// Enable JSON Schema validation
    #[serde(default = "default_true")]
    pub enable_schema_validation: bool,

    /// Fail `initialize` when the relevance graph contains a cycle
    #[serde(default)]
    pub reject_relevance_cycles: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            throttle_window: default_throttle_window(),
            storage_prefix: default_storage_prefix(),
            persist_timeout: None,
            enable_schema_validation: true,
            reject_relevance_cycles: false,
        }
    }
}

impl Config {
    /// Layered sources: defaults, then the YAML file (if any), then environment
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the configuration from the layered sources
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config: Config = Self::figment(path).extract()?;
        tracing::debug!(?config, "settings engine configuration loaded");
        Ok(config)
    }
}

fn default_throttle_window() -> Duration {
    Duration::from_millis(100)
}

fn default_storage_prefix() -> String {
    "settings:".to_string()
}

fn default_true() -> bool {
    true
}
