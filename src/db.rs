use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Connect to Postgres (hosted) or SQLite (local development, tests).
pub async fn connect(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(db_url.to_owned());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    // Every pooled connection to `sqlite::memory:` would get its own empty database.
    if db_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    tracing::info!(
        "Connecting to database: {}",
        if db_url.starts_with("postgres") { "PostgreSQL" } else { "SQLite" }
    );

    Database::connect(options).await
}

/// Apply every pending schema migration.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await
}
