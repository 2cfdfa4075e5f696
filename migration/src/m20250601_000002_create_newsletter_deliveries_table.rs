use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NewsletterDeliveries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NewsletterDeliveries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(NewsletterDeliveries::BatchId).uuid().not_null())
                    .col(ColumnDef::new(NewsletterDeliveries::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(NewsletterDeliveries::Title).string().not_null())
                    .col(ColumnDef::new(NewsletterDeliveries::Email).string().not_null())
                    .col(ColumnDef::new(NewsletterDeliveries::Name).string().not_null())
                    .col(ColumnDef::new(NewsletterDeliveries::Status).string_len(16).not_null())
                    .col(ColumnDef::new(NewsletterDeliveries::Attempts).integer().not_null().default(1))
                    .col(ColumnDef::new(NewsletterDeliveries::Error).text())
                    .col(
                        ColumnDef::new(NewsletterDeliveries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_newsletter_deliveries_batch_id")
                    .table(NewsletterDeliveries::Table)
                    .col(NewsletterDeliveries::BatchId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NewsletterDeliveries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum NewsletterDeliveries {
    Table,
    Id,
    BatchId,
    Kind,
    Title,
    Email,
    Name,
    Status,
    Attempts,
    Error,
    CreatedAt,
}
