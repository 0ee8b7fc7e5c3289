use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiEndpoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiEndpoints::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::Path)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::AccessKey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApiEndpoints::SystemPrompt).text())
                    .col(ColumnDef::new(ApiEndpoints::ProviderId).integer().not_null())
                    .col(
                        ColumnDef::new(ApiEndpoints::StreamOutput)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_api_endpoints_provider_id")
                            .from(ApiEndpoints::Table, ApiEndpoints::ProviderId)
                            .to(Providers::Table, Providers::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_api_endpoints_provider_id")
                    .table(ApiEndpoints::Table)
                    .col(ApiEndpoints::ProviderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiEndpoints::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiEndpoints {
    Table,
    Id,
    Path,
    AccessKey,
    SystemPrompt,
    ProviderId,
    StreamOutput,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Providers {
    Table,
    Id,
}
