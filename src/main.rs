use anyhow::Context;
use tracing_subscriber::EnvFilter;

use easylease_api::app::{build_router, AppState};
use easylease_api::{config, store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting EasyLease API in {:?} mode", config.environment);
    if config.security.jwt_secret == config::DEFAULT_JWT_SECRET && !easylease_api::is_development!() {
        tracing::warn!("JWT_SECRET is not set; using the built-in development secret");
    }

    let store = store::open(config).await.context("failed to open store")?;
    tracing::info!("Using {} store", store.backend_name());

    let app = build_router(AppState::new(store, config.clone()));

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("EasyLease API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
