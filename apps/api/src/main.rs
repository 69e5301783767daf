mod config;
mod embedding;
mod errors;
mod extraction;
mod routes;
mod screening;
mod state;
mod text;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::{HashingEncoder, HttpEncoder, TextEncoder};
use crate::routes::build_router;
use crate::screening::Screener;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the process-wide encoder
    let encoder = build_encoder(&config)?;
    info!(
        "Encoder initialized ({}, dimension {})",
        encoder.name(),
        encoder.dimension()
    );

    let screener = Screener::from_config(encoder, &config);
    info!(
        "Analysis defaults: alpha={} top_n={} max_chunk_len={} pooling={}",
        config.analysis.alpha,
        config.analysis.top_n,
        config.analysis.max_chunk_len,
        config.analysis.pooling
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        screener: Arc::new(screener),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP encoder when `EMBEDDING_API_URL` is set, offline hashing otherwise.
fn build_encoder(config: &Config) -> Result<Arc<dyn TextEncoder>> {
    match &config.embedding.api_url {
        Some(url) => Ok(Arc::new(HttpEncoder::new(url, &config.embedding)?)),
        None => {
            info!("EMBEDDING_API_URL not set, using the offline hashing encoder");
            Ok(Arc::new(HashingEncoder::new(config.embedding.dimension)))
        }
    }
}
