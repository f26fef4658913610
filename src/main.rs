//! Portal worker entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use portal_worker::server::{create_router, AppState};
use portal_worker::{WorkerConfig, WORKER_NAME};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = WorkerConfig::from_env();
    if config.secret.is_none() {
        tracing::warn!("WORKER_SECRET not set; running without authentication (dev mode)");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(AppState::new(config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("{} listening on {}", WORKER_NAME, addr);
    axum::serve(listener, app).await?;

    Ok(())
}
