//! Migration: Create users table.

use sea_orm_migration::prelude::*;

use domain::{MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, PROVIDER_LOCAL};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(MAX_EMAIL_LENGTH as u32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string_len(MAX_NAME_LENGTH as u32).not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().null())
                    .col(ColumnDef::new(Users::ProfileImageUrl).text().null())
                    .col(ColumnDef::new(Users::GoogleId).string().null().unique_key())
                    .col(
                        ColumnDef::new(Users::Provider)
                            .string_len(20)
                            .not_null()
                            .default(PROVIDER_LOCAL),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
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
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    Name,
    PasswordHash,
    ProfileImageUrl,
    GoogleId,
    Provider,
    CreatedAt,
}
