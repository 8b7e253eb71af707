//! Servidor web Axum do compêndio, com WebSocket para acompanhar o auto-link
//! de entidades passo a passo.

mod app;
mod config;
mod render;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::{router, AppState};
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let state = Arc::new(AppState::from_config(&config).context("falha ao carregar o compêndio")?);
    let app = router(state, config.static_dir.clone());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("não foi possível escutar em {}", config.bind))?;
    info!("🚀 Compêndio iniciado em http://{}", config.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
