use std::sync::Arc;
use std::time::Duration;

use bookshelf_api::{
    config::Config,
    db::{self, Cache, CacheWriterHandle, PgCatalogue, PgRatingsSource},
    routes::{create_router, AppState},
    services::{
        providers::{CachedSummaryProvider, TextGenerationProvider},
        RecommendationEngine, SummaryProvider,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookshelf_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url)?;

    let summaries: Arc<dyn SummaryProvider> = Arc::new(
        TextGenerationProvider::new(
            config.summary_api_url.clone(),
            config.summary_api_token.clone(),
        )
        .with_max_new_tokens(config.summary_max_new_tokens),
    );

    // Only free-form generation is cached; book creation always asks the provider
    let mut generator = summaries.clone();
    let mut cache_handle: Option<CacheWriterHandle> = None;
    if let Some(redis_url) = &config.redis_url {
        let client = db::create_redis_client(redis_url)?;
        let (cache, handle) = Cache::new(client);
        generator = Arc::new(CachedSummaryProvider::new(
            summaries.clone(),
            cache,
            config.summary_cache_ttl_secs,
        ));
        cache_handle = Some(handle);
        tracing::info!("Generation cache enabled");
    }

    let ratings = PgRatingsSource::new(pool.clone(), &config.ratings_table)?;
    let mut engine = RecommendationEngine::new(Arc::new(ratings));
    if let Some(max_age) = config.ratings_max_age_secs {
        engine = engine.with_max_age(Duration::from_secs(max_age));
    }

    let state = Arc::new(
        AppState::new(Arc::new(PgCatalogue::new(pool)), summaries, Arc::new(engine))
            .with_generator(generator),
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        addr = %config.bind_addr(),
        ratings_table = %config.ratings_table,
        "Server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
