use std::sync::Arc;

use bookclub_api::config::Config;
use bookclub_api::db;
use bookclub_api::routes::{create_router, AppState};
use bookclub_api::services::{RecommendationEngine, RecommendationScheduler};
use bookclub_api::stores::postgres::{PgLibraryStore, PgRecommendationStore, PgUserDirectory};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!("Configuration loaded, starting server");

    let db_pool = db::create_pool(&config.database_url).await?;
    info!("Running database migrations");
    db::run_migrations(&db_pool).await?;

    let library = Arc::new(PgLibraryStore::new(db_pool.clone()));
    let recommendations = Arc::new(PgRecommendationStore::new(db_pool.clone()));
    let users = Arc::new(PgUserDirectory::new(db_pool.clone()));
    let engine = Arc::new(RecommendationEngine::new(library, recommendations));

    if config.scheduler_enabled {
        RecommendationScheduler::new(engine.clone(), users).spawn();
    }

    let state = AppState {
        db_pool,
        engine,
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(host = %config.host, port = config.port, "Listening for requests");
    axum::serve(listener, app).await?;

    Ok(())
}
