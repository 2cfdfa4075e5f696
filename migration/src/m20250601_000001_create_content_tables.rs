use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Articles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Articles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Articles::Title).string().not_null())
                    .col(ColumnDef::new(Articles::Excerpt).text().not_null())
                    .col(ColumnDef::new(Articles::Content).text()) // rich text html
                    .col(ColumnDef::new(Articles::Category).string().not_null())
                    .col(ColumnDef::new(Articles::ImageUrl).string())
                    .col(ColumnDef::new(Articles::Status).string_len(16).not_null().default("draft"))
                    .col(timestamp(Articles::CreatedAt))
                    .col(timestamp(Articles::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_articles_status_created_at")
                    .table(Articles::Table)
                    .col(Articles::Status)
                    .col(Articles::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Companies::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Companies::Name).string().not_null())
                    .col(ColumnDef::new(Companies::Sector).string().not_null())
                    .col(ColumnDef::new(Companies::Description).text().not_null())
                    .col(ColumnDef::new(Companies::LogoUrl).string())
                    .col(ColumnDef::new(Companies::Content).text())
                    .col(ColumnDef::new(Companies::Status).string_len(16).not_null().default("draft"))
                    .col(timestamp(Companies::CreatedAt))
                    .col(timestamp(Companies::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Founders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Founders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Founders::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Founders::Name).string().not_null())
                    .col(ColumnDef::new(Founders::Title).string().not_null().default(""))
                    .col(ColumnDef::new(Founders::ImageUrl).string())
                    .col(ColumnDef::new(Founders::LinkedinUrl).string())
                    .col(ColumnDef::new(Founders::TwitterUrl).string())
                    .col(ColumnDef::new(Founders::Position).integer().not_null().default(0))
                    .col(timestamp(Founders::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_founders_company_id")
                            .from(Founders::Table, Founders::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Experiences::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Experiences::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Experiences::Company).string().not_null())
                    .col(ColumnDef::new(Experiences::Position).string().not_null())
                    .col(ColumnDef::new(Experiences::Duration).string().not_null())
                    .col(ColumnDef::new(Experiences::LogoUrl).string())
                    .col(ColumnDef::new(Experiences::OrderIndex).integer().not_null().default(0))
                    .col(timestamp(Experiences::CreatedAt))
                    .col(timestamp(Experiences::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Singleton tables: the unique `singleton` column backs the atomic upsert.
        manager
            .create_table(
                Table::create()
                    .table(PersonalInfo::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PersonalInfo::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PersonalInfo::Singleton).integer().not_null().default(1).unique_key())
                    .col(ColumnDef::new(PersonalInfo::Name).string().not_null())
                    .col(ColumnDef::new(PersonalInfo::Title).string().not_null())
                    .col(ColumnDef::new(PersonalInfo::Bio).text().not_null())
                    .col(ColumnDef::new(PersonalInfo::ProfileImageUrl).string())
                    .col(timestamp(PersonalInfo::CreatedAt))
                    .col(timestamp(PersonalInfo::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SiteSettings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SiteSettings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SiteSettings::Singleton).integer().not_null().default(1).unique_key())
                    .col(ColumnDef::new(SiteSettings::SiteName).string().not_null())
                    .col(ColumnDef::new(SiteSettings::SiteDescription).text())
                    .col(ColumnDef::new(SiteSettings::ContactEmail).string())
                    .col(ColumnDef::new(SiteSettings::LinkedinUrl).string())
                    .col(ColumnDef::new(SiteSettings::TwitterUrl).string())
                    .col(ColumnDef::new(SiteSettings::FacebookUrl).string())
                    .col(ColumnDef::new(SiteSettings::InstagramUrl).string())
                    .col(ColumnDef::new(SiteSettings::WhatsappNumber).string())
                    .col(timestamp(SiteSettings::CreatedAt))
                    .col(timestamp(SiteSettings::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NewsletterSubscribers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NewsletterSubscribers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(NewsletterSubscribers::Name).string().not_null())
                    .col(ColumnDef::new(NewsletterSubscribers::Email).string().not_null().unique_key())
                    .col(
                        ColumnDef::new(NewsletterSubscribers::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(timestamp(NewsletterSubscribers::CreatedAt))
                    .col(timestamp(NewsletterSubscribers::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NewsletterSubscribers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SiteSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PersonalInfo::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Experiences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Founders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Articles::Table).to_owned())
            .await
    }
}

fn timestamp<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(DeriveIden)]
enum Articles {
    Table,
    Id,
    Title,
    Excerpt,
    Content,
    Category,
    ImageUrl,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    Name,
    Sector,
    Description,
    LogoUrl,
    Content,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Founders {
    Table,
    Id,
    CompanyId,
    Name,
    Title,
    ImageUrl,
    LinkedinUrl,
    TwitterUrl,
    Position,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Experiences {
    Table,
    Id,
    Company,
    Position,
    Duration,
    LogoUrl,
    OrderIndex,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PersonalInfo {
    Table,
    Id,
    Singleton,
    Name,
    Title,
    Bio,
    ProfileImageUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SiteSettings {
    Table,
    Id,
    Singleton,
    SiteName,
    SiteDescription,
    ContactEmail,
    LinkedinUrl,
    TwitterUrl,
    FacebookUrl,
    InstagramUrl,
    WhatsappNumber,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NewsletterSubscribers {
    Table,
    Id,
    Name,
    Email,
    Status,
    CreatedAt,
    UpdatedAt,
}
