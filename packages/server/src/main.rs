use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use journal_common::storage::filesystem::FilesystemPhotoStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use journal_server::config::AppConfig;
use journal_server::database::init_db;
use journal_server::polish::OpenAiPolisher;
use journal_server::rate_limit::RateLimiter;
use journal_server::seed::ensure_indexes;
use journal_server::state::AppState;
use journal_server::utils::jwt::JwtVerifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("journal_server=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    ensure_indexes(&db).await?;

    let photo_store = FilesystemPhotoStore::new(
        PathBuf::from(&config.storage.root),
        config.storage.max_photo_size,
    )
    .await
    .with_context(|| format!("Failed to open photo storage at {}", config.storage.root))?;
    let polisher = OpenAiPolisher::new(&config.polish).context("Failed to build polish client")?;
    let verifier = JwtVerifier::new(&config.auth);

    let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    if rate_limiter.is_enabled() {
        let limiter = rate_limiter.clone();
        let period = Duration::from_secs(config.rate_limit.window_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                limiter.cleanup();
            }
        });
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        db,
        config: Arc::new(config),
        verifier: Arc::new(verifier),
        polisher: Arc::new(polisher),
        photo_store: Arc::new(photo_store),
        rate_limiter,
    };

    let app = journal_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
