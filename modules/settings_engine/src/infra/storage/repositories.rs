//! SeaORM storage adapter

use super::entity;
use super::mapper::{decode_value, encode_value, entry_key};
use super::migrations::Migrator;
use crate::config::Config;
use crate::contract::SettingValue;
use crate::domain::repository::StorageAdapter;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter,
};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

pub struct SeaOrmStorage {
    db: Arc<DatabaseConnection>,
    prefix: String,
}

impl SeaOrmStorage {
    /// Wrap an existing connection; the schema must already be migrated
    pub fn new(db: Arc<DatabaseConnection>, prefix: impl Into<String>) -> Self {
        Self {
            db,
            prefix: prefix.into(),
        }
    }

    /// Connect and run migrations
    pub async fn connect(
        options: impl Into<ConnectOptions>,
        prefix: impl Into<String>,
    ) -> Result<Self> {
        let db = Database::connect(options)
            .await
            .context("connecting to settings database")?;
        Self::migrate(&db).await?;
        Ok(Self::new(Arc::new(db), prefix))
    }

    /// Connect and migrate, namespacing entries by `config.storage_prefix`
    pub async fn connect_with(
        options: impl Into<ConnectOptions>,
        config: &Config,
    ) -> Result<Self> {
        Self::connect(options, config.storage_prefix.clone()).await
    }

    pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
        Migrator::up(db, None)
            .await
            .context("running settings migrations")?;
        tracing::info!("settings storage migrations completed");
        Ok(())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl StorageAdapter for SeaOrmStorage {
    async fn get(&self, key: &str) -> Result<Option<SettingValue>> {
        let name = entry_key(&self.prefix, key);
        let row = entity::Entity::find_by_id(name.clone())
            .one(&*self.db)
            .await
            .with_context(|| format!("reading {name}"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        match decode_value(row.value.as_bytes()) {
            Some(value) => Ok(Some(value)),
            None => {
                tracing::warn!(entry = %name, "purging undecodable persisted entry");
                entity::Entity::delete_by_id(name.clone())
                    .exec(&*self.db)
                    .await
                    .with_context(|| format!("purging {name}"))?;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &SettingValue) -> Result<()> {
        let name = entry_key(&self.prefix, key);
        let active = entity::ActiveModel {
            entry_key: Set(name.clone()),
            value: Set(encode_value(value)?),
            updated_at: Set(chrono::Utc::now()),
        };

        entity::Entity::insert(active)
            .on_conflict(
                OnConflict::column(entity::Column::EntryKey)
                    .update_columns([entity::Column::Value, entity::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&*self.db)
            .await
            .with_context(|| format!("writing {name}"))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let name = entry_key(&self.prefix, key);
        entity::Entity::delete_by_id(name.clone())
            .exec(&*self.db)
            .await
            .with_context(|| format!("deleting {name}"))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        // LIKE treats `_` and `%` as wildcards, so narrow the candidates exactly
        let names: Vec<String> = entity::Entity::find()
            .filter(entity::Column::EntryKey.starts_with(self.prefix.as_str()))
            .all(&*self.db)
            .await
            .context("listing settings entries")?
            .into_iter()
            .map(|row| row.entry_key)
            .filter(|name| name.starts_with(&self.prefix))
            .collect();

        if names.is_empty() {
            return Ok(());
        }

        let removed = entity::Entity::delete_many()
            .filter(entity::Column::EntryKey.is_in(names))
            .exec(&*self.db)
            .await
            .context("clearing settings entries")?;
        tracing::debug!(prefix = %self.prefix, removed = removed.rows_affected, "settings storage cleared");
        Ok(())
    }
}
