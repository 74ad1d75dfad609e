use crate::api::{app_router, build_state};
use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

/// Binds the configured address and serves until interrupted.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let state = build_state(config)?;
    let router = app_router(state, &config.server);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await
        .context("Server error")
}
