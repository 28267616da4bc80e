//! HTTP surface: routing, shared state, and the serve loop.
//!
//! ## Endpoints
//!
//! - `GET /` - liveness payload
//! - `POST /upload` - multipart `file` field; query `database`, `user`, `password` override the
//!   base connection, optional `table` and `schema` pick the destination
//! - `GET /test` - runs a literal query on a pooled connection

mod routes;

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use deadpool_postgres::Pool;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::connection::ConnectionDescriptor;
use crate::import::Importer;

pub use routes::{trim_trailing_whitespace, ApiError, UploadParams, UploadResponse};

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Runs imports; owns the table writer.
    pub importer: Importer,
    /// Descriptor parsed from the configured database URI.
    pub base: ConnectionDescriptor,
    /// Process-wide connection pool.
    pub pool: Pool,
    /// Maximum accepted request body, in bytes.
    pub upload_limit_bytes: usize,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let limit = state.upload_limit_bytes;
    Router::new()
        .route("/", get(routes::root))
        .route("/upload", post(routes::upload))
        .route("/test", get(routes::pool_check))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C, then close the pool.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let pool = state.pool.clone();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close();
    info!("connection pool closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
