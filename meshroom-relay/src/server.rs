use crate::relay_config::RelayConfig;
use crate::signaling::{RelayService, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(service: RelayService, path: &str) -> Router {
    Router::new()
        .route(path, get(ws_handler))
        .with_state(service)
}

/// Serves the relay on an already bound listener until the server fails.
pub async fn serve(listener: TcpListener, config: RelayConfig) -> Result<()> {
    let service = RelayService::new(&config);
    let app = router(service, &config.path);

    info!(
        "Relay listening on ws://{}{}",
        listener.local_addr()?,
        config.path
    );
    axum::serve(listener, app)
        .await
        .context("Relay server failed")?;
    Ok(())
}

pub async fn run(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    serve(listener, config).await
}
