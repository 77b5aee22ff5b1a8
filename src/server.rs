//! Router assembly and the listening loop

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::routes;
use crate::{Launcher, Renderer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    renderer: Arc<Renderer>,
}

impl AppState {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer: Arc::new(renderer),
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }
}

/// Build the full application router
pub fn app(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::pdf::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CatchPanicLayer::custom(routes::error::handle_panic))
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM
pub async fn serve(config: ServiceConfig, launcher: Arc<dyn Launcher>) -> anyhow::Result<()> {
    let engine_config = config.engine_config()?;
    let renderer = Renderer::new(launcher, engine_config)
        .with_max_concurrent(config.max_concurrent_renders);
    let app = app(AppState::new(renderer), config.body_limit_bytes());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("PDF Generator API running on {}", addr);
    tracing::info!("Health check: http://{}/", addr);
    tracing::info!("Generate PDF: POST http://{}/api/generate-pdf", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
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
