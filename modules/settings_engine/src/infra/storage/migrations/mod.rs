//! Database migrations for the settings entry table

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250110_000001_create_setting_entries::Migration)]
    }
}

mod m20250110_000001_create_setting_entries {
    use super::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SettingEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SettingEntries::EntryKey)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SettingEntries::Value).text().not_null())
                        .col(
                            ColumnDef::new(SettingEntries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SettingEntries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SettingEntries {
        Table,
        EntryKey,
        Value,
        UpdatedAt,
    }
}
