//! Scan Vision Server
//!
//! OCR HTTP service for scanned images and PDFs, backed by PaddleOCR
//! models running on ONNX Runtime.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scan_vision_server::config::Config;
use scan_vision_server::routes;
use scan_vision_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading filters or config
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "scan_vision_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting Scan Vision Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Detection model: {}", config.models.det_model);
    tracing::info!("Recognition model: {}", config.models.rec_model);
    if config.auth.api_key.is_none() {
        tracing::warn!("API_KEY is not set; OCR endpoints accept unauthenticated requests");
    }

    let state = AppState::new(config.clone());

    // Warm up the models; on failure the first OCR request retries
    if let Err(e) = state.ocr().backend().await {
        tracing::warn!("OCR models not loaded at startup: {}", e);
    }

    let app = routes::router(state);

    let ip = config
        .server
        .host
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("Invalid SERVER_HOST {:?}", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    tracing::info!("Scan Vision Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
