//! Settings store - the single source of truth for current values
//!
//! Every mutation runs the same pipeline:
//!
//! 1. validate the whole batch up front (fail-fast, nothing changes on error)
//! 2. persist every entry through the storage adapter and wait for all writes
//! 3. merge into the snapshot and notify subscribers, through the throttle
//!
//! Steps 1 and 2 are never throttled. Only the observable snapshot transition
//! is coalesced, so the snapshot can lag behind storage by at most one window.

use super::events::{SnapshotListener, Subscribers, SubscriptionId};
use super::relevance;
use super::repository::StorageAdapter;
use super::throttle::{CallOutcome, Throttle};
use super::validation::{check_consistency, validate_definition, validate_value};
use crate::config::Config;
use crate::contract::{
    Configuration, Controller, Definition, SettingKey, SettingValue, SettingsError, Snapshot,
    Structure,
};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::time::Instant;

struct Inner {
    config: Config,
    storage: Option<Arc<dyn StorageAdapter>>,
    values: RwLock<Snapshot>,
    controllers: RwLock<HashMap<SettingKey, Controller>>,
    error: RwLock<Option<SettingsError>>,
    throttle: Mutex<Throttle<Snapshot>>,
    subscribers: Subscribers,
}

impl Inner {
    /// Merge a patch into the snapshot and notify with the result
    fn commit(&self, patch: Snapshot) {
        if patch.is_empty() {
            return;
        }
        let snapshot = {
            let mut values = self.values.write();
            values.extend(patch);
            values.clone()
        };
        self.subscribers.notify(&snapshot);
    }
}

/// Settings store handle
///
/// Cloning is cheap and every clone refers to the same state. There is no
/// global instance; callers construct a store and pass it where it is needed.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Create an empty store; `storage` is optional (memory-only when absent)
    pub fn new(config: Config, storage: Option<Arc<dyn StorageAdapter>>) -> Self {
        let throttle = Throttle::new(config.throttle_window);
        Self {
            inner: Arc::new(Inner {
                config,
                storage,
                values: RwLock::new(Snapshot::new()),
                controllers: RwLock::new(HashMap::new()),
                error: RwLock::new(None),
                throttle: Mutex::new(throttle),
                subscribers: Subscribers::new(),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // ===== Initialization =====

    /// Register every definition of `configuration` and restore its values
    ///
    /// Definitions are validated first. Persisted values are read back; absent,
    /// undecodable or invalid entries fall back to the default. All reads finish
    /// before any controller is registered, so a failed read leaves the store
    /// untouched. The initial snapshot is applied immediately.
    pub async fn initialize(&self, configuration: &Configuration) -> Result<(), SettingsError> {
        for definition in &configuration.definitions {
            validate_definition(definition, self.schema_validation())
                .map_err(|e| self.fail(e))?;
        }

        check_consistency(configuration).log();

        let report =
            relevance::validate_relevance_tree(&configuration.structure, &configuration.definitions);
        if self.inner.config.reject_relevance_cycles && !report.valid {
            let key = report.cycle_keys.iter().next().cloned().unwrap_or_default();
            return Err(self.fail(SettingsError::InvalidDefinition {
                key,
                reason: report.errors.join("; "),
            }));
        }

        let mut initial = Snapshot::new();
        for definition in &configuration.definitions {
            let value = self.restore_value(definition).await?;
            initial.insert(definition.key.clone(), value);
        }

        {
            let mut controllers = self.inner.controllers.write();
            for definition in &configuration.definitions {
                let controller = Controller::resolve(definition.clone(), &configuration.structure);
                controllers.insert(definition.key.clone(), controller);
            }
        }

        tracing::info!(
            settings = configuration.definitions.len(),
            persisted = self.inner.storage.is_some(),
            "settings store initialized"
        );
        self.inner.commit(initial);
        Ok(())
    }

    async fn restore_value(&self, definition: &Definition) -> Result<SettingValue, SettingsError> {
        let Some(storage) = &self.inner.storage else {
            return Ok(definition.default_value.clone());
        };

        let key = &definition.key;
        let stored = self
            .guarded(key, storage.get(key))
            .await
            .map_err(|e| self.fail(e))?;

        match stored {
            Some(value) => match validate_value(definition, &value, self.schema_validation()) {
                Ok(()) => {
                    tracing::debug!(%key, %value, "restored persisted value");
                    Ok(value)
                }
                Err(error) => {
                    tracing::warn!(%key, %error, "persisted value rejected; using default");
                    Ok(definition.default_value.clone())
                }
            },
            None => Ok(definition.default_value.clone()),
        }
    }

    // ===== Mutations =====

    /// Validate, persist and apply a single value
    pub async fn set_value(
        &self,
        key: impl Into<SettingKey>,
        value: impl Into<SettingValue>,
    ) -> Result<(), SettingsError> {
        self.set_values([(key.into(), value.into())]).await
    }

    /// Validate, persist and apply a batch of values
    ///
    /// The batch is rejected as a whole if any entry fails validation or any
    /// write fails; in that case the snapshot is unchanged.
    pub async fn set_values<I, K, V>(&self, entries: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SettingKey>,
        V: Into<SettingValue>,
    {
        let batch: Snapshot = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if batch.is_empty() {
            return Ok(());
        }

        self.validate_batch(&batch).map_err(|e| self.fail(e))?;
        self.persist_batch(&batch).await.map_err(|e| self.fail(e))?;

        tracing::debug!(keys = ?batch.keys().collect::<Vec<_>>(), "settings accepted");
        self.apply(batch);
        Ok(())
    }

    /// Reset one setting to its default; unknown keys are ignored
    pub async fn reset_to_default(&self, key: &str) -> Result<(), SettingsError> {
        let default = self
            .inner
            .controllers
            .read()
            .get(key)
            .map(|c| c.default_value().clone());

        match default {
            Some(value) => self.set_value(key, value).await,
            None => {
                tracing::info!(%key, "no controller registered; reset ignored");
                Ok(())
            }
        }
    }

    /// Reset every registered setting to its default as one batch
    pub async fn reset_all_to_defaults(&self) -> Result<(), SettingsError> {
        let defaults: Vec<(SettingKey, SettingValue)> = self
            .inner
            .controllers
            .read()
            .values()
            .map(|c| (c.key().to_string(), c.default_value().clone()))
            .collect();
        self.set_values(defaults).await
    }

    fn validate_batch(&self, batch: &Snapshot) -> Result<(), SettingsError> {
        let controllers = self.inner.controllers.read();
        for (key, value) in batch {
            let controller = controllers
                .get(key)
                .ok_or_else(|| SettingsError::UnknownSetting { key: key.clone() })?;
            validate_value(&controller.definition, value, self.schema_validation())?;
        }
        Ok(())
    }

    async fn persist_batch(&self, batch: &Snapshot) -> Result<(), SettingsError> {
        let Some(storage) = &self.inner.storage else {
            return Ok(());
        };

        let writes = batch
            .iter()
            .map(|(key, value)| self.guarded(key, storage.set(key, value)));

        // Wait for every write before deciding, then report the first failure
        join_all(writes).await.into_iter().collect()
    }

    /// Run an adapter call, applying the configured timeout
    async fn guarded<T>(
        &self,
        key: &str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, SettingsError> {
        let result = match self.inner.config.persist_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| SettingsError::Timeout {
                    key: key.to_string(),
                })?,
            None => call.await,
        };
        result.map_err(|e| SettingsError::persistence(key, &e))
    }

    fn apply(&self, patch: Snapshot) {
        let outcome = self.inner.throttle.lock().call(patch, Instant::now());
        match outcome {
            CallOutcome::Fire(patch) => self.inner.commit(patch),
            CallOutcome::Deferred {
                deadline,
                schedule: true,
            } => Self::schedule_trailing(Arc::downgrade(&self.inner), deadline),
            CallOutcome::Deferred { .. } => {}
        }
    }

    fn schedule_trailing(inner: Weak<Inner>, deadline: Instant) {
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let pending = inner.throttle.lock().fire(Instant::now());
            if let Some(patch) = pending {
                inner.commit(patch);
            }
        });
    }

    /// Apply any coalesced update now instead of waiting for the window
    pub fn flush(&self) {
        let pending = self.inner.throttle.lock().take_pending(Instant::now());
        if let Some(patch) = pending {
            self.inner.commit(patch);
        }
    }

    /// Remove every persisted entry under the adapter's namespace
    ///
    /// In-memory values are left as they are.
    pub async fn clear_storage(&self) -> Result<(), SettingsError> {
        let Some(storage) = &self.inner.storage else {
            return Ok(());
        };
        self.guarded("*", storage.clear())
            .await
            .map_err(|e| self.fail(e))
    }

    // ===== Controllers =====

    /// Register or fully replace the controller for its key
    ///
    /// Stored values are not re-validated against the new controller.
    pub fn register_controller(&self, controller: Controller) -> Option<Controller> {
        let key = controller.key().to_string();
        let previous = self.inner.controllers.write().insert(key.clone(), controller);
        tracing::debug!(%key, replaced = previous.is_some(), "controller registered");
        previous
    }

    /// Remove the controller for `key`; the value stays in the snapshot
    pub fn unregister_controller(&self, key: &str) -> Option<Controller> {
        let removed = self.inner.controllers.write().remove(key);
        tracing::debug!(%key, removed = removed.is_some(), "controller unregistered");
        removed
    }

    pub fn controller(&self, key: &str) -> Option<Controller> {
        self.inner.controllers.read().get(key).cloned()
    }

    /// Registered controllers, ordered by key
    pub fn controllers(&self) -> Vec<Controller> {
        let mut controllers: Vec<Controller> =
            self.inner.controllers.read().values().cloned().collect();
        controllers.sort_by(|a, b| a.key().cmp(b.key()));
        controllers
    }

    /// Definitions of the registered controllers, ordered by key
    pub fn definitions(&self) -> Vec<Definition> {
        self.controllers().into_iter().map(|c| c.definition).collect()
    }

    // ===== Reads =====

    pub fn snapshot(&self) -> Snapshot {
        self.inner.values.read().clone()
    }

    pub fn get_value(&self, key: &str) -> Option<SettingValue> {
        self.inner.values.read().get(key).cloned()
    }

    /// Last validation or persistence error recorded by the store
    pub fn last_error(&self) -> Option<SettingsError> {
        self.inner.error.read().clone()
    }

    pub fn clear_error(&self) {
        *self.inner.error.write() = None;
    }

    fn fail(&self, error: SettingsError) -> SettingsError {
        tracing::warn!(%error, "settings operation rejected");
        *self.inner.error.write() = Some(error.clone());
        error
    }

    fn schema_validation(&self) -> bool {
        self.inner.config.enable_schema_validation
    }

    // ===== Subscriptions =====

    /// Invoke `listener` with the full snapshot after every applied change
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let listener: SnapshotListener = Arc::new(listener);
        self.inner.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    // ===== Relevance =====

    /// Relevance of `key` against the current snapshot and registered definitions
    pub fn is_relevant(&self, key: &str, structure: &Structure) -> bool {
        relevance::evaluate(key, structure, &self.definitions(), &self.snapshot())
    }

    /// Currently relevant keys of `structure`
    pub fn visible_settings(&self, structure: &Structure) -> BTreeSet<SettingKey> {
        relevance::visible_settings(structure, &self.definitions(), &self.snapshot())
    }
}
