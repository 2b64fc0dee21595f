//! Binary crate for the weather gateway HTTP server.
//!
//! This crate focuses on:
//! - Process bootstrap (logging, configuration, client construction)
//! - HTTP routing and request handlers
//! - CORS response post-processing

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use weather_core::{Config, GcsStore, OpenMeteoProvider, TokenSource, VertexModel};

mod app;
mod handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("Invalid environment configuration")?;

    let token = TokenSource::from_env();
    let state = app::AppState {
        store: Arc::new(GcsStore::new(config.bucket_name.clone(), token.clone())),
        model: Arc::new(VertexModel::new(config.project_id.clone(), token)),
        forecast: Arc::new(OpenMeteoProvider::new()),
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Weather gateway listening on {addr}");

    axum::serve(listener, app::build_router(state))
        .await
        .context("Server error")?;

    Ok(())
}
