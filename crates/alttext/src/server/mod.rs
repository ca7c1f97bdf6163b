//! HTTP server: the upload page and the analysis API.

mod handlers;

use alttext_core::{AltTextGenerator, Compressor};
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<AltTextGenerator>,
    pub compressor: Arc<Compressor>,
    /// Maximum decoded image size in megabytes
    pub max_upload_mb: u64,
}

/// Build the router. Bodies over `body_limit_bytes` are rejected with 413.
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/analyzeImg", post(handlers::analyze_image))
        .route("/api/health", get(|| async { "OK" }))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: AppState, body_limit_bytes: usize) -> Result<()> {
    let app = router(state, body_limit_bytes);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
