use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use weblarek_api_rust::{config, database::DatabaseManager, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    tracing::info!("Starting WebLarek API in {:?} mode", config.environment);
    if weblarek_api_rust::is_production!() && !config.security.secure_cookies {
        tracing::warn!("Session cookies are not marked Secure in production");
    }

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("WebLarek API listening on http://{}", bind_addr);

    axum::serve(listener, routes::app().into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    DatabaseManager::close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
