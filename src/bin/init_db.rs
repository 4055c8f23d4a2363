//! Destructive database reset: drops the application tables and replays the
//! embedded migrations from scratch.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("connect to database")?;

    tracing::info!("dropping existing tables");
    sqlx::query("DROP TABLE IF EXISTS captions").execute(&db).await?;
    sqlx::query("DROP TABLE IF EXISTS users CASCADE").execute(&db).await?;
    sqlx::query("DROP TABLE IF EXISTS _sqlx_migrations").execute(&db).await?;

    tracing::info!("recreating schema");
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    tracing::info!("database initialized");
    Ok(())
}
