use sqlx::{postgres::PgPoolOptions, PgPool};

/// Opens the PostgreSQL connection pool shared by the whole service
///
/// The handle is cheap to clone; connections are capped at a small
/// fixed size and recycled as requests complete.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Runs pending schema migrations at startup
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
