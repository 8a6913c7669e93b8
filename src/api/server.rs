use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{
    services::{compress, health},
    state::AppState,
};
use crate::config::Config;
use crate::observability::Metrics;
use crate::pipeline::{Capabilities, Pipeline};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Routes with permissive CORS so browser front-ends on any origin can call us.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/compress", post(compress))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or_else(|| config.server.bind_addr());

    info!(path = %config.workspace.output_dir.display(), "Preparing output directory");
    tokio::fs::create_dir_all(&config.workspace.output_dir)
        .await
        .map_err(|e| {
            format!(
                "Failed to create output directory {}: {}",
                config.workspace.output_dir.display(),
                e
            )
        })?;

    let metrics = Arc::new(Metrics::new());
    let capabilities = Capabilities::from_config(&config);
    let pipeline = Pipeline::build(&config, capabilities, metrics)
        .map_err(|e| format!("Failed to build pipeline: {}", e))?;

    let state = AppState::new(pipeline);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "smolvid listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
