//! Common test fixtures: configurations, storage doubles and a recording subscriber
#![allow(dead_code, clippy::unwrap_used)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use settings_engine::{
    Configuration, InMemoryStorage, Relevance, SettingValue, Snapshot, StorageAdapter, Store,
    Validator,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test output; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn print_test_header(test_name: &str, purpose: &[&str]) {
    init_tracing();
    println!("\n🧪 TEST: {}", test_name);
    if let Some(first) = purpose.first() {
        println!("📋 PURPOSE: {}", first);
    }
    for line in purpose.iter().skip(1) {
        println!("   {}", line);
    }
}

/// Audio tab: `audio.volume` and `audio.output` only matter while audio is enabled
pub fn audio_configuration() -> Configuration {
    Configuration::builder()
        .tab("audio", "Audio")
        .setting("audio.enabled")
        .boolean(true)
        .label("Enable audio")
        .done()
        .unwrap()
        .group("mixer", "Mixer")
        .setting("audio.volume")
        .number(50.0)
        .validator(Validator::range(0.0, 100.0))
        .relevant_when(Relevance::depends_on("audio.enabled"))
        .done()
        .unwrap()
        .setting("audio.output")
        .text("speakers")
        .validator(Validator::OneOf(vec!["speakers".into(), "headphones".into()]))
        .visible_when(Relevance::depends_on("audio.enabled"))
        .done()
        .unwrap()
        .end()
        .end()
        .build()
}

/// Single `level` setting bounded to 0..=10
pub fn level_configuration() -> Configuration {
    Configuration::builder()
        .tab("game", "Game")
        .setting("level")
        .number(5.0)
        .validator(Validator::range(0.0, 10.0))
        .done()
        .unwrap()
        .end()
        .build()
}

/// Storage that rejects writes for selected keys and otherwise delegates
#[derive(Clone, Default)]
pub struct FailingStorage {
    inner: InMemoryStorage,
    fail_keys: HashSet<String>,
    fail_reads: bool,
}

impl FailingStorage {
    pub fn failing_writes(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn backing(&self) -> &InMemoryStorage {
        &self.inner
    }
}

#[async_trait]
impl StorageAdapter for FailingStorage {
    async fn get(&self, key: &str) -> Result<Option<SettingValue>> {
        if self.fail_reads {
            return Err(anyhow!("storage unavailable"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &SettingValue) -> Result<()> {
        if self.fail_keys.contains(key) {
            return Err(anyhow!("disk full"));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

/// Storage whose writes take `delay` to complete
#[derive(Clone, Default)]
pub struct SlowStorage {
    inner: InMemoryStorage,
    delay: Duration,
}

impl SlowStorage {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryStorage::new(),
            delay,
        }
    }
}

#[async_trait]
impl StorageAdapter for SlowStorage {
    async fn get(&self, key: &str) -> Result<Option<SettingValue>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &SettingValue) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

/// Subscriber that keeps every snapshot it was notified with
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<Snapshot>>>,
}

impl Recorder {
    pub fn attach(store: &Store) -> Self {
        let recorder = Self::default();
        let seen = recorder.seen.clone();
        store.subscribe(move |snapshot| seen.lock().push(snapshot.clone()));
        recorder
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn last(&self) -> Option<Snapshot> {
        self.seen.lock().last().cloned()
    }
}
