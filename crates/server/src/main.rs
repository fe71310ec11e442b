use anyhow::Context;
use chat_core::config::Config;
use log::{info, warn};
use server::{create_app, AppState};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting conversational RAG server");

    let config = Config::load_from_env()
        .unwrap_or_else(|e| {
            warn!("Could not load config ({}), using defaults", e);
            Config::default()
        })
        .with_env_overrides();

    let state = Arc::new(AppState::from_config(&config).context("Failed to initialize services")?);
    let app = create_app(state);

    let bind_addr = &config.server.bind_addr;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
