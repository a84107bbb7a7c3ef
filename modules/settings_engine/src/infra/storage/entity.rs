//! SeaORM entity for persisted setting entries

use sea_orm::entity::prelude::*;

/// One persisted value per `prefix + key`
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "setting_entries")]
pub struct Model {
    /// Namespaced entry name (`prefix + setting key`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub entry_key: String,

    /// JSON-encoded scalar value
    pub value: String,

    /// Last write timestamp
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
