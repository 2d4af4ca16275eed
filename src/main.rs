use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use greenbox_api::{
    config::Config,
    db::{self, Cache, PostgresStore},
    middleware::JwtVerifier,
    routes::{create_router, AppState},
    services::{
        rankers::{GeminiRanker, HeuristicRanker, Ranker},
        RecommendationEngine,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client).await;

    let store = Arc::new(PostgresStore::new(pool));

    let gemini = GeminiRanker::new(
        cache,
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
        Duration::from_secs(config.gemini_timeout_secs),
    )?;
    let rankers: Vec<Arc<dyn Ranker>> = vec![Arc::new(HeuristicRanker), Arc::new(gemini)];

    let engine = Arc::new(RecommendationEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        rankers,
    ));

    let state = AppState {
        engine,
        profiles: store,
        verifier: Arc::new(JwtVerifier::new(&config.jwt_secret)),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server listening");
    axum::serve(listener, app).await?;

    cache_writer.shutdown().await;

    Ok(())
}
