//! API Server for the Tasky task board
//!
//! This is the main entry point for the Rust backend.
//! It loads the task file, then serves the REST API.

mod config;
mod routes;
mod state;

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasky_api=debug,tasky_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Using data directory: {:?}", config.data_dir);

    // The store must be loaded before the listener accepts connections
    let app_state = AppState::new(config.tasks_path())
        .await
        .context("Failed to initialize task store")?;

    let app = routes::router()
        .with_state(app_state)
        .layer(config.cors_origins.layer())
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("REST API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining requests");
}
