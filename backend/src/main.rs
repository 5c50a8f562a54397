use anyhow::Context;
use axum::http::HeaderValue;
use tracing::info;
use tracing_subscriber::EnvFilter;

use health_tracker_backend::config::AppConfig;
use health_tracker_backend::{create_router, initialize_backend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    info!("Starting health tracker backend ({} tier)", config.device_tier);

    let state = initialize_backend(&config).await?;

    let allowed_origin = HeaderValue::from_str(&config.allowed_origin)
        .with_context(|| format!("Invalid allowed_origin: {}", config.allowed_origin))?;
    let app = create_router(state, allowed_origin);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
