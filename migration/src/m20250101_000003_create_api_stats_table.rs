use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiStats::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiStats::ApiEndpointId).integer().not_null())
                    .col(ColumnDef::new(ApiStats::Date).string_len(10).not_null())
                    .col(
                        ColumnDef::new(ApiStats::CallCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ApiStats::InputTokens)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ApiStats::OutputTokens)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ApiStats::CacheHitTokens)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ApiStats::LastUpdated)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建唯一约束：同一路径同一天只允许一行
        manager
            .create_index(
                Index::create()
                    .name("idx_api_stats_endpoint_date")
                    .table(ApiStats::Table)
                    .col(ApiStats::ApiEndpointId)
                    .col(ApiStats::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_api_stats_date")
                    .table(ApiStats::Table)
                    .col(ApiStats::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiStats::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiStats {
    Table,
    Id,
    ApiEndpointId,
    Date,
    CallCount,
    InputTokens,
    OutputTokens,
    CacheHitTokens,
    LastUpdated,
}
