use anyhow::Context;
use journeys::{config::Config, create_app, db, AppState};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    let conn = db::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    db::migrate(&conn).await.context("failed to run migrations")?;

    let app = create_app(AppState::from_config(&config, conn));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
